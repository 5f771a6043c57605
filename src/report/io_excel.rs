// Reading survey exports saved in the Excel format.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::{debug, warn};
use snafu::prelude::*;
use survey_crosstab::Dataset;

use crate::report::io_common::assemble_dataset;
use crate::report::*;

pub fn read_excel_file(path: &str, worksheet_name: Option<&str>) -> ReportResult<Dataset> {
    let wrange = get_range(path, worksheet_name)?;
    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row
            .iter()
            .map(|c| cell_text(c).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };
    debug!("read_excel_file: header: {:?}", header);
    let rows: Vec<Vec<Option<String>>> = iter
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    assemble_dataset(path, &header, rows)
}

/// The text of a cell, as it would appear in a CSV export.
/// Whole numbers are written without decimal part.
fn cell_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => Some(s.clone()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(format!("{}", *f as i64))
        }
        DataType::Float(f) => Some(f.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        DataType::Empty => None,
        _ => {
            warn!("cell_text: ignoring cell {:?}", cell);
            None
        }
    }
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> ReportResult<Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet_name);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(name) = worksheet_name {
        let wrange = workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?;
        return Ok(wrange);
    }
    let all_worksheets = workbook.worksheets();
    match all_worksheets.as_slice() {
        [] => EmptyExcelSnafu { path }.fail(),
        [(name, wrange)] => {
            debug!("get_range: path: {:?} using worksheet: {:?}", path, name);
            Ok(wrange.clone())
        }
        l => AmbiguousWorksheetSnafu {
            path,
            names: l.iter().map(|(n, _)| n.clone()).collect::<Vec<String>>(),
        }
        .fail(),
    }
}
