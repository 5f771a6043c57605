// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

/// A survey export held in memory.
///
/// Rows are respondents, identified by their position. Cells are `None` when
/// the respondent left them empty. The schema is shared by all the rows, but
/// which columns exist varies from one survey to the next.
///
/// In most cases, it is easier to use the [`crate::builder::DatasetBuilder`].
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Dataset {
    pub(crate) columns: Vec<String>,
    pub(crate) column_positions: HashMap<String, usize>,
    pub(crate) rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_positions.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_positions.get(name).cloned()
    }

    /// All the columns whose name contains the given fragment, in schema order.
    pub fn columns_containing(&self, fragment: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| if c.contains(fragment) { Some(idx) } else { None })
            .collect()
    }

    /// The content of one cell. Out of range positions are treated as empty cells.
    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Appends the rows of another dataset after the rows of this one.
    ///
    /// Columns are aligned by name. Columns only present in one of the two datasets
    /// are kept, and the rows that do not have them get empty cells.
    pub fn merge(self, other: Dataset) -> Dataset {
        let mut columns = self.columns.clone();
        for c in other.columns.iter() {
            if !self.column_positions.contains_key(c) {
                columns.push(c.clone());
            }
        }
        let column_positions: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.clone(), idx))
            .collect();
        let width = columns.len();

        let mut rows: Vec<Vec<Option<String>>> = Vec::with_capacity(self.len() + other.len());
        for mut row in self.rows.into_iter() {
            row.resize(width, None);
            rows.push(row);
        }
        for row in other.rows.into_iter() {
            let mut aligned: Vec<Option<String>> = vec![None; width];
            for (idx, cell) in row.into_iter().enumerate() {
                if let Some(pos) = other
                    .columns
                    .get(idx)
                    .and_then(|c| column_positions.get(c))
                {
                    aligned[*pos] = cell;
                }
            }
            rows.push(aligned);
        }
        Dataset {
            columns,
            column_positions,
            rows,
        }
    }
}

/// The type of a survey question, which decides how its cells are read and
/// how its counts are summarized.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuestionKind {
    /// One answer per respondent, in a single column.
    Single,
    /// "Select all that apply": every column whose name contains the question
    /// holds one selected item.
    MultiSelect,
    /// A grid of statements, encoded in one cell as `Statement: Value | Statement: Value`.
    Matrix,
    /// A grid in which the values are ranks (1 is the best).
    Rank,
    /// A numeric rating in a single column.
    Slider,
}

impl QuestionKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::MultiSelect => "multi",
            QuestionKind::Matrix => "matrix",
            QuestionKind::Rank => "rank",
            QuestionKind::Slider => "slider",
        }
    }
}

/// A question to tabulate.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Question {
    /// The exact column name, or for multi-select questions the fragment shared
    /// by all the columns of the question.
    pub id: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(id: &str, kind: QuestionKind) -> Question {
        Question {
            id: id.to_string(),
            kind,
        }
    }
}

/// A demographic axis along which the respondents are split.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Overall,
    Gender,
    Generation,
    Age,
    Region,
    Education,
}

impl Dimension {
    /// All the dimensions, in the order in which they appear in a report.
    pub const ALL: [Dimension; 6] = [
        Dimension::Overall,
        Dimension::Gender,
        Dimension::Generation,
        Dimension::Age,
        Dimension::Region,
        Dimension::Education,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Overall => "Overall",
            Dimension::Gender => "Gender",
            Dimension::Generation => "Generation",
            Dimension::Age => "Age",
            Dimension::Region => "Region",
            Dimension::Education => "Education",
        }
    }

    /// The header of the column that holds the segment labels.
    pub fn segment_header(&self) -> &'static str {
        match self {
            Dimension::Overall => OVERALL_SEGMENT,
            d => d.name(),
        }
    }

    pub fn section_name(&self) -> String {
        format!("{} Data", self.name())
    }
}

/// The label of the single segment of the overall dimension.
pub const OVERALL_SEGMENT: &str = "All respondents";

/// A generation bucket, derived from the year of birth.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Generation {
    GenZ,
    Millennial,
    GenX,
    BabyBoomer,
}

impl Generation {
    /// The buckets, in report order.
    pub const ALL: [Generation; 4] = [
        Generation::GenZ,
        Generation::Millennial,
        Generation::GenX,
        Generation::BabyBoomer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Generation::GenZ => "Gen Z",
            Generation::Millennial => "Millennial",
            Generation::GenX => "Gen X",
            Generation::BabyBoomer => "Baby Boomer",
        }
    }

    /// The inclusive range of birth years for this bucket.
    pub fn birth_years(&self) -> (i32, i32) {
        match self {
            Generation::GenZ => (1997, 2012),
            Generation::Millennial => (1981, 1996),
            Generation::GenX => (1965, 1980),
            Generation::BabyBoomer => (1946, 1964),
        }
    }

    pub fn from_birth_year(year: i32) -> Option<Generation> {
        Generation::ALL.iter().cloned().find(|g| {
            let (start, end) = g.birth_years();
            start <= year && year <= end
        })
    }
}

// ********* Configuration **********

/// What to do with a grid cell that does not follow the `Statement: Value` format.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Strictness {
    /// The whole answer of the respondent to this question is rejected and reported.
    Strict,
    /// Only the malformed entries are dropped, the rest of the cell still counts.
    Lenient,
}

/// What to do with a question that cannot be found in the dataset.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UnknownQuestionPolicy {
    /// Abort the whole report.
    FailFast,
    /// Skip the tables of this question and continue with the others.
    Skip,
}

/// How the denominator of a segment is counted.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DenominatorMode {
    /// A respondent counts once if they gave at least one countable answer.
    Respondents,
    /// Every record of the segment counts, answered or not.
    /// Only useful to reproduce historical reports.
    AllRecords,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabulationRules {
    /// The year used to turn an age into a year of birth.
    pub reference_year: i32,
    pub strictness: Strictness,
    pub unknown_question_policy: UnknownQuestionPolicy,
    pub denominator_mode: DenominatorMode,
}

impl TabulationRules {
    pub fn new(reference_year: i32) -> TabulationRules {
        TabulationRules {
            reference_year,
            strictness: Strictness::Lenient,
            unknown_question_policy: UnknownQuestionPolicy::FailFast,
            denominator_mode: DenominatorMode::Respondents,
        }
    }
}

// ******** Output data structures *********

/// A percentage or an average, or the marker for a segment without any respondent.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Statistic {
    Value(f64),
    NoData,
}

impl Statistic {
    pub fn value(&self) -> Option<f64> {
        match self {
            Statistic::Value(v) => Some(*v),
            Statistic::NoData => None,
        }
    }

    /// Divides without ever producing a division fault: a zero denominator gives `NoData`.
    pub fn ratio(numerator: f64, denominator: f64) -> Statistic {
        if denominator == 0.0 {
            Statistic::NoData
        } else {
            Statistic::Value(numerator / denominator)
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum RowLabel {
    Response(String),
    Rating(i64),
    /// The weighted mean (slider rating or flipped rank).
    Average,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TableRow {
    /// The statement, for grid questions.
    pub statement: Option<String>,
    pub label: RowLabel,
    /// The raw count behind the statistic, when there is one.
    pub count: Option<u64>,
    pub value: Statistic,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SegmentStats {
    pub segment: String,
    /// The denominator of this segment.
    pub respondents: u64,
    pub rows: Vec<TableRow>,
}

/// An answer that was set aside because its cell could not be read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RejectedResponse {
    pub row: usize,
    pub cell: String,
}

/// The tabulation of one question along one dimension.
#[derive(PartialEq, Debug, Clone)]
pub struct SegmentTable {
    pub question: String,
    pub kind: QuestionKind,
    pub dimension: Dimension,
    pub statements: Vec<String>,
    pub responses: Vec<String>,
    pub segments: Vec<SegmentStats>,
    pub rejected: Vec<RejectedResponse>,
}

impl SegmentTable {
    /// True when there is nothing worth reporting: no segment, or no count at all.
    pub fn is_empty(&self) -> bool {
        !self
            .segments
            .iter()
            .flat_map(|s| s.rows.iter())
            .any(|r| r.count.unwrap_or(0) > 0)
    }

    pub fn segment(&self, label: &str) -> Option<&SegmentStats> {
        self.segments.iter().find(|s| s.segment == label)
    }
}

/// Errors that prevent a tabulation from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationError {
    /// The question does not match any column of the dataset.
    UnknownQuestion { question: String },
    /// A grid cell could not be read.
    MalformedResponse {
        question: String,
        row: usize,
        cell: String,
    },
    /// The dataset does not have any column.
    EmptyDataset,
}

impl Error for TabulationError {}

impl Display for TabulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulationError::UnknownQuestion { question } => {
                write!(f, "question {:?} not found in the dataset columns", question)
            }
            TabulationError::MalformedResponse {
                question,
                row,
                cell,
            } => write!(
                f,
                "malformed response to {:?} at row {}: {:?}",
                question, row, cell
            ),
            TabulationError::EmptyDataset => write!(f, "the dataset has no column"),
        }
    }
}
