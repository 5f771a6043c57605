pub use crate::config::*;

use std::collections::HashMap;

/// A builder for assembling a dataset row by row.
///
/// Readers for the various input formats should go through this builder.
///
/// ```
/// pub use survey_crosstab::builder::DatasetBuilder;
/// # use survey_crosstab::TabulationError;
///
/// let mut builder = DatasetBuilder::new(&["Gender".to_string(), "Do you like tea?".to_string()])?;
///
/// builder.add_row_simple(&["Female", "Yes"])?;
/// builder.add_row(&[None, Some("No".to_string())])?;
///
/// let dataset = builder.build();
/// assert_eq!(dataset.len(), 2);
///
/// # Ok::<(), TabulationError>(())
/// ```
pub struct DatasetBuilder {
    pub(crate) _columns: Vec<String>,
    pub(crate) _rows: Vec<Vec<Option<String>>>,
}

impl DatasetBuilder {
    /// Column names must be unique. A dataset without columns cannot be tabulated.
    pub fn new(columns: &[String]) -> Result<DatasetBuilder, TabulationError> {
        if columns.is_empty() {
            return Err(TabulationError::EmptyDataset);
        }
        Ok(DatasetBuilder {
            _columns: columns.to_vec(),
            _rows: Vec::new(),
        })
    }

    /// Adds a row given as text. Empty (or whitespace only) cells are recorded as missing.
    pub fn add_row_simple(&mut self, cells: &[&str]) -> Result<(), TabulationError> {
        let row: Vec<Option<String>> = cells.iter().map(|s| Some(s.to_string())).collect();
        self.add_row(&row)
    }

    /// Adds a row. Short rows are padded with missing cells, extra cells are dropped.
    pub fn add_row(&mut self, cells: &[Option<String>]) -> Result<(), TabulationError> {
        let mut row: Vec<Option<String>> = cells
            .iter()
            .take(self._columns.len())
            .map(|c| match c {
                Some(s) if s.trim().is_empty() => None,
                x => x.clone(),
            })
            .collect();
        row.resize(self._columns.len(), None);
        self._rows.push(row);
        Ok(())
    }

    pub fn build(self) -> Dataset {
        // On duplicated names, the first column wins.
        let mut column_positions: HashMap<String, usize> = HashMap::new();
        for (idx, c) in self._columns.iter().enumerate() {
            column_positions.entry(c.clone()).or_insert(idx);
        }
        Dataset {
            columns: self._columns,
            column_positions,
            rows: self._rows,
        }
    }
}
