// Writing reports as sectioned CSV files.
//
// Each section is a block: the section name on its own line, the header, then
// the rows. Blocks are separated by an empty line.

use std::io::Write;

use log::info;
use snafu::prelude::*;
use survey_crosstab::assemble::{Report, Section};

use crate::report::*;

fn section_to_csv(section: &Section) -> ReportResult<Vec<u8>> {
    let name = section.name.as_str();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);
    wtr.write_record([name]).context(WritingCsvSnafu { name })?;
    wtr.write_record(&section.table.header)
        .context(WritingCsvSnafu { name })?;
    for row in section.table.rows.iter() {
        wtr.write_record(row.iter().map(|c| c.to_string()))
            .context(WritingCsvSnafu { name })?;
    }
    match wtr.into_inner() {
        Ok(buf) => Ok(buf),
        Err(e) => whatever!("Error writing section {}: {}", name, e.error()),
    }
}

/// Writes all the sections of a report, in order. `path` is only used for messages.
pub fn write_sections<W: Write>(mut out: W, report: &Report, path: &str) -> ReportResult<()> {
    for name in report.skipped.iter() {
        info!("No {} to write.", name);
    }
    for (idx, section) in report.sections.iter().enumerate() {
        let block = section_to_csv(section)?;
        if idx > 0 {
            out.write_all(b"\n")
                .context(WritingOutputSnafu { path })?;
        }
        out.write_all(&block).context(WritingOutputSnafu { path })?;
    }
    out.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}
