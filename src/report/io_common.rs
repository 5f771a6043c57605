use std::path::Path;

use log::debug;
use snafu::prelude::*;
use survey_crosstab::builder::DatasetBuilder;
use survey_crosstab::Dataset;

use crate::report::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Column names as they should be matched against the questions: without
/// surrounding spaces, and without the byte order mark some exports start with.
pub fn clean_header(header: &[String]) -> Vec<String> {
    header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect()
}

/// Assembles the rows read from a file into a dataset.
pub fn assemble_dataset<I>(path: &str, header: &[String], rows: I) -> ReportResult<Dataset>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let columns = clean_header(header);
    debug!(
        "assemble_dataset: {}: columns: {:?}",
        simplify_file_name(path),
        columns
    );
    let mut builder = DatasetBuilder::new(&columns).context(TabulationSnafu {})?;
    for row in rows {
        builder.add_row(&row).context(TabulationSnafu {})?;
    }
    Ok(builder.build())
}
