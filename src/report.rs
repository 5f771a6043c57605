use log::{debug, info, warn};

use survey_crosstab::assemble::*;
use survey_crosstab::*;

use snafu::{prelude::*, Snafu};

use chrono::{Datelike, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::report::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_sections;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet {name:?} in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("No worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display(
        "Several worksheets in {path}, choose one with excelWorksheetName: {names:?}"
    ))]
    AmbiguousWorksheet { path: String, names: Vec<String> },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of the CSV data"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing section {name}"))]
    WritingCsv { source: csv::Error, name: String },
    #[snafu(display("Invalid value {value:?} for {key}"))]
    InvalidConfig { key: String, value: String },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Tabulation failed"))]
    Tabulation { source: TabulationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// The current year (UTC), used when no reference year is given.
fn current_year() -> i32 {
    Utc::now().year()
}

fn read_dataset(root: &Path, sources: &[FileSource]) -> ReportResult<Dataset> {
    let mut res: Option<Dataset> = None;
    for cfs in sources.iter() {
        let p: PathBuf = root.join(&cfs.file_path);
        let path = p.as_path().display().to_string();
        info!("Attempting to read survey file {:?}", path);
        let ds = match cfs.provider.as_str() {
            "csv" => io_csv::read_csv_file(&path)?,
            "xlsx" => io_excel::read_excel_file(&path, cfs.excel_worksheet_name.as_deref())?,
            x => {
                return InvalidConfigSnafu {
                    key: "provider",
                    value: x,
                }
                .fail()
            }
        };
        info!(
            "Read {} respondents and {} columns from {:?}",
            ds.len(),
            ds.columns().len(),
            path
        );
        res = Some(match res {
            Some(prev) => prev.merge(ds),
            None => ds,
        });
    }
    match res {
        Some(ds) => Ok(ds),
        None => whatever!("No data source in the configuration"),
    }
}

/// Writes one report to a file in the output directory, or to the standard output.
fn write_report(output_dir: &Path, output_file: &str, report: &Report) -> ReportResult<()> {
    if output_file == "stdout" {
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        return io_sections::write_sections(handle, report, "stdout");
    }
    let p = output_dir.join(output_file);
    let path = p.display().to_string();
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).context(WritingOutputSnafu { path: path.clone() })?;
    }
    let file = fs::File::create(&p).context(WritingOutputSnafu { path: path.clone() })?;
    info!("Writing report to {:?}", path);
    io_sections::write_sections(std::io::BufWriter::new(file), report, &path)
}

fn build_summary_js(report_name: &str, reports: &[QuestionReport]) -> JSValue {
    let questions: Vec<JSValue> = reports
        .iter()
        .map(|qr| {
            let sections: Vec<JSValue> = qr
                .tables
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| {
                    let segments: Vec<JSValue> = t
                        .segments
                        .iter()
                        .map(|s| json!({"segment": s.segment, "respondents": s.respondents}))
                        .collect();
                    json!({"name": t.dimension.section_name(), "segments": segments})
                })
                .collect();
            json!({
                "question": qr.question.id,
                "type": qr.question.kind.name(),
                "found": qr.found,
                "sections": sections,
                "skipped": qr.report.skipped,
                "rejected": qr.rejected(),
            })
        })
        .collect();
    json!({"report": report_name, "questions": questions})
}

/// Runs all the questions of a report configuration.
///
/// `root` is the directory against which the relative paths of the
/// configuration are resolved. Returns the JSON summary of the report.
pub fn run_report(config: &ReportConfig, root: &Path) -> ReportResult<JSValue> {
    let reference_year = config
        .output_settings
        .reference_year
        .unwrap_or_else(current_year);
    let rules = validate_rules(&config.rules, reference_year)?;
    let dimensions = read_dimensions(&config.rules)?;
    info!(
        "Report {:?}: rules: {:?} dimensions: {:?}",
        config.output_settings.report_name, rules, dimensions
    );

    let dataset = read_dataset(root, &config.data_sources)?;
    let survey = Survey::new(&dataset, &rules).context(TabulationSnafu {})?;

    let output_dir: PathBuf = match &config.output_settings.output_directory {
        Some(d) => root.join(d),
        None => root.to_path_buf(),
    };

    if let Some(demographics) = &config.demographics {
        let report = demographic_summary(&survey);
        write_report(&output_dir, &demographics.output_file, &report)?;
    }

    let mut reports: Vec<QuestionReport> = Vec::new();
    for (idx, qc) in config.questions.iter().enumerate() {
        let question = Question::new(&qc.question, parse_kind(&qc.kind)?);
        let qr = build_question_report(&survey, &question, &dimensions)
            .context(TabulationSnafu {})?;
        if qr.found {
            write_report(&output_dir, &qc.output_file_name(idx), &qr.report)?;
        } else {
            warn!("Question {:?} is not in the data, no report written", qc.question);
        }
        reports.push(qr);
    }

    Ok(build_summary_js(
        &config.output_settings.report_name,
        &reports,
    ))
}

fn write_summary(summary: &JSValue, out: &str) -> ReportResult<()> {
    let pretty_js = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if out == "stdout" {
        println!("{}", pretty_js);
        return Ok(());
    }
    let mut file = fs::File::create(out).context(WritingOutputSnafu { path: out })?;
    file.write_all(pretty_js.as_bytes())
        .context(WritingOutputSnafu { path: out })?;
    Ok(())
}

/// Compares a summary with a reference summary stored in a file.
/// Differences are printed and reported as an error.
fn check_summary(summary: &JSValue, reference_path: &str) -> ReportResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("reference summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        whatever!("Difference detected between calculated summary and reference summary")
    }
    info!("The summary matches the reference {:?}", reference_path);
    Ok(())
}

/// Entry point of the program.
pub fn run(args: &Args) -> ReportResult<()> {
    let (mut config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu { path: config_path })?
                .to_path_buf();
            (config, root)
        }
        None => (config_from_args(args)?, PathBuf::new()),
    };
    apply_args(&mut config, args)?;
    debug!("config: {:?}", config);

    let summary = run_report(&config, &root)?;

    if let Some(out) = &args.summary {
        write_summary(&summary, out)?;
    }
    if let Some(reference) = &args.reference {
        check_summary(&summary, reference)?;
    }
    Ok(())
}
