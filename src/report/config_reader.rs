use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;
use std::fs;

use survey_crosstab::*;

use crate::args::Args;
use crate::report::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: String,
    /// Relative to the directory of the configuration file.
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "referenceYear")]
    pub reference_year: Option<i32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// csv or xlsx
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

impl QuestionConfig {
    pub fn output_file_name(&self, idx: usize) -> String {
        match &self.output_file {
            Some(f) if !f.is_empty() => f.clone(),
            _ => format!("question_{}.csv", idx + 1),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulesConfig {
    /// strict or lenient (default)
    #[serde(rename = "malformedResponses")]
    pub malformed_responses: Option<String>,
    /// fail (default) or skip
    #[serde(rename = "unknownQuestions")]
    pub unknown_questions: Option<String>,
    /// respondents (default) or allRecords
    #[serde(rename = "denominators")]
    pub denominators: Option<String>,
    #[serde(rename = "dimensions")]
    pub dimensions: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DemographicsConfig {
    #[serde(rename = "outputFile")]
    pub output_file: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "dataSources")]
    pub data_sources: Vec<FileSource>,
    pub questions: Vec<QuestionConfig>,
    #[serde(default)]
    pub rules: RulesConfig,
    pub demographics: Option<DemographicsConfig>,
}

pub fn read_config(path: &str) -> ReportResult<ReportConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ReportConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn parse_kind(s: &str) -> ReportResult<QuestionKind> {
    let res = match s {
        "single" => QuestionKind::Single,
        "multi" => QuestionKind::MultiSelect,
        "matrix" => QuestionKind::Matrix,
        "rank" => QuestionKind::Rank,
        "slider" => QuestionKind::Slider,
        x => {
            return InvalidConfigSnafu {
                key: "type",
                value: x,
            }
            .fail()
        }
    };
    Ok(res)
}

pub fn parse_dimension(s: &str) -> ReportResult<Dimension> {
    let res = match s.to_lowercase().as_str() {
        "overall" => Dimension::Overall,
        "gender" => Dimension::Gender,
        "generation" => Dimension::Generation,
        "age" => Dimension::Age,
        "region" => Dimension::Region,
        "education" => Dimension::Education,
        _ => {
            return InvalidConfigSnafu {
                key: "dimensions",
                value: s,
            }
            .fail()
        }
    };
    Ok(res)
}

pub fn validate_rules(rules: &RulesConfig, reference_year: i32) -> ReportResult<TabulationRules> {
    let mut res = TabulationRules::new(reference_year);
    res.strictness = match rules.malformed_responses.as_deref() {
        None | Some("lenient") => Strictness::Lenient,
        Some("strict") => Strictness::Strict,
        Some(x) => {
            return InvalidConfigSnafu {
                key: "malformedResponses",
                value: x,
            }
            .fail()
        }
    };
    res.unknown_question_policy = match rules.unknown_questions.as_deref() {
        None | Some("fail") => UnknownQuestionPolicy::FailFast,
        Some("skip") => UnknownQuestionPolicy::Skip,
        Some(x) => {
            return InvalidConfigSnafu {
                key: "unknownQuestions",
                value: x,
            }
            .fail()
        }
    };
    res.denominator_mode = match rules.denominators.as_deref() {
        None | Some("respondents") => DenominatorMode::Respondents,
        Some("allRecords") => DenominatorMode::AllRecords,
        Some(x) => {
            return InvalidConfigSnafu {
                key: "denominators",
                value: x,
            }
            .fail()
        }
    };
    Ok(res)
}

/// The requested dimensions. Defaults to gender, generation and region.
pub fn read_dimensions(rules: &RulesConfig) -> ReportResult<Vec<Dimension>> {
    match &rules.dimensions {
        Some(l) => l.iter().map(|s| parse_dimension(s)).collect(),
        None => Ok(vec![
            Dimension::Gender,
            Dimension::Generation,
            Dimension::Region,
        ]),
    }
}

fn guess_provider(path: &str) -> String {
    if path.to_lowercase().ends_with(".xlsx") {
        "xlsx".to_string()
    } else {
        "csv".to_string()
    }
}

/// Builds the configuration of a single question report from the command line.
pub fn config_from_args(args: &Args) -> ReportResult<ReportConfig> {
    let input = match &args.input {
        Some(x) => x.clone(),
        None => whatever!("Either --config or --input must be provided"),
    };
    let question = match &args.question {
        Some(x) => x.clone(),
        None => whatever!("--question must be provided when no configuration file is given"),
    };
    let kind = args.kind.clone().unwrap_or_else(|| "single".to_string());
    // Checked early to fail before reading the data.
    parse_kind(&kind)?;

    Ok(ReportConfig {
        output_settings: OutputSettings {
            report_name: question.clone(),
            output_directory: None,
            reference_year: None,
        },
        data_sources: vec![],
        questions: vec![QuestionConfig {
            question,
            kind,
            output_file: Some(args.out.clone().unwrap_or_else(|| "stdout".to_string())),
        }],
        rules: RulesConfig::default(),
        demographics: None,
    })
}

/// Applies the command line options on top of a configuration.
pub fn apply_args(config: &mut ReportConfig, args: &Args) -> ReportResult<()> {
    if let Some(input) = &args.input {
        let provider = args
            .input_type
            .clone()
            .unwrap_or_else(|| guess_provider(input));
        config.data_sources = vec![FileSource {
            provider,
            file_path: input.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        }];
    }
    if let Some(year) = args.reference_year {
        config.output_settings.reference_year = Some(year);
    }
    if args.strict {
        config.rules.malformed_responses = Some("strict".to_string());
    }
    if args.skip_unknown {
        config.rules.unknown_questions = Some("skip".to_string());
    }
    if args.legacy_denominators {
        config.rules.denominators = Some("allRecords".to_string());
    }
    if let Some(dims) = &args.dimension {
        // Validated here to report the flag rather than the configuration.
        for d in dims.iter() {
            parse_dimension(d)?;
        }
        config.rules.dimensions = Some(dims.clone());
    }
    Ok(())
}
