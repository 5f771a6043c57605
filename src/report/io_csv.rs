// Primitives for reading CSV files.

use std::fs::File;
use std::io::Read;

use log::debug;
use snafu::prelude::*;
use survey_crosstab::Dataset;

use crate::report::io_common::assemble_dataset;
use crate::report::*;

pub fn read_csv_file(path: &str) -> ReportResult<Dataset> {
    let file = File::open(path)
        .map_err(csv::Error::from)
        .context(CsvOpenSnafu { path })?;
    read_csv_dataset(file, path)
}

/// Reads a CSV export: the first line holds the column names, every other line
/// is a respondent. Lines may be shorter or longer than the header.
pub fn read_csv_dataset<R: Read>(rdr: R, path: &str) -> ReportResult<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(rdr);
    let header: Vec<String> = reader
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for (idx, line_r) in reader.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_dataset: lineno: {:?} row: {:?}", lineno, line);
        rows.push(line.iter().map(|s| Some(s.to_string())).collect());
    }
    assemble_dataset(path, &header, rows)
}
