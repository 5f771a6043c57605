//! Reading the answers to one question.
//!
//! Each question kind has a handler that knows where its answers are stored,
//! how to read them, what the domain of the question is and how to summarize
//! the counts of one segment.

use log::{debug, warn};
use std::collections::HashSet;

use crate::codec;
use crate::config::*;
use crate::demographics::parse_whole_number;

/// The answer of one respondent to one question.
#[derive(PartialEq, Debug, Clone)]
pub enum ResponseValue {
    Single(String),
    /// The selected items, trimmed and without duplicates.
    Multi(Vec<String>),
    /// Statement and value pairs of a grid question. For rank questions, the
    /// values are whole numbers.
    Keyed(Vec<(String, String)>),
    Rating(f64),
}

/// Where the answers to a question live and which values they can take.
#[derive(PartialEq, Debug, Clone)]
pub struct ResponseModel {
    pub question: Question,
    pub columns: Vec<usize>,
    /// Grid questions only.
    pub statements: Vec<String>,
    /// The response categories. For sliders, the ratings of `rating_range`.
    pub responses: Vec<String>,
    pub rating_range: Option<(i64, i64)>,
}

impl ResponseModel {
    /// The number of statement slots. Non-grid questions have a single implicit one.
    pub fn statement_slots(&self) -> usize {
        self.statements.len().max(1)
    }

    /// The (statement, response) slots that an answer increments.
    /// An empty list means that the answer does not count.
    pub fn positions(&self, value: &ResponseValue) -> Vec<(usize, usize)> {
        let response_idx = |r: &str| self.responses.iter().position(|x| x == r);
        match value {
            ResponseValue::Single(s) => response_idx(s.as_str()).map(|i| (0, i)).into_iter().collect(),
            ResponseValue::Multi(l) => l
                .iter()
                .filter_map(|s| response_idx(s.as_str()))
                .map(|i| (0, i))
                .collect(),
            ResponseValue::Keyed(entries) => entries
                .iter()
                .filter_map(|(s, v)| {
                    let s_idx = self.statements.iter().position(|x| x == s)?;
                    let r_idx = response_idx(v.as_str())?;
                    Some((s_idx, r_idx))
                })
                .collect(),
            ResponseValue::Rating(f) => match self.rating_range {
                Some((min, max)) if f.fract() == 0.0 && *f >= min as f64 && *f <= max as f64 => {
                    (*f as i64)
                        .checked_sub(min)
                        .map(|idx| (0, idx as usize))
                        .into_iter()
                        .collect()
                }
                _ => vec![],
            },
        }
    }
}

/// The kind-specific parts of the tabulation.
pub(crate) trait KindHandler {
    /// The columns that hold the answers to the question.
    fn locate(&self, dataset: &Dataset, question: &Question) -> Vec<usize> {
        dataset.column_index(&question.id).into_iter().collect()
    }

    /// Reads the answer of one respondent. `None` when there is nothing to count.
    fn extract(
        &self,
        dataset: &Dataset,
        question: &Question,
        columns: &[usize],
        row: usize,
        strictness: Strictness,
    ) -> Result<Option<ResponseValue>, TabulationError>;

    /// Fills the statements, responses and rating range of the model from
    /// the answers of all the respondents.
    fn domain(&self, model: &mut ResponseModel, answers: &[&ResponseValue]);

    /// Summarizes the counts of one segment, indexed by [statement][response].
    fn aggregate(&self, model: &ResponseModel, counts: &[Vec<u64>], denominator: u64)
        -> Vec<TableRow>;
}

pub(crate) fn handler(kind: QuestionKind) -> &'static dyn KindHandler {
    match kind {
        QuestionKind::Single => &SingleHandler,
        QuestionKind::MultiSelect => &MultiSelectHandler,
        QuestionKind::Matrix => &MatrixHandler,
        QuestionKind::Rank => &RankHandler,
        QuestionKind::Slider => &SliderHandler,
    }
}

/// The answers of all the respondents to one question, read once.
#[derive(PartialEq, Debug, Clone)]
pub struct QuestionResponses {
    pub model: ResponseModel,
    /// One entry per row of the dataset.
    pub answers: Vec<Option<ResponseValue>>,
    pub rejected: Vec<RejectedResponse>,
}

/// Locates the question in the dataset, reads every answer and computes the domain.
pub fn read_question(
    dataset: &Dataset,
    question: &Question,
    strictness: Strictness,
) -> Result<QuestionResponses, TabulationError> {
    let h = handler(question.kind);
    let columns = h.locate(dataset, question);
    if columns.is_empty() {
        return Err(TabulationError::UnknownQuestion {
            question: question.id.clone(),
        });
    }
    debug!(
        "read_question: {:?} ({}) in columns {:?}",
        question.id,
        question.kind.name(),
        columns
    );

    let mut answers: Vec<Option<ResponseValue>> = Vec::with_capacity(dataset.len());
    let mut rejected: Vec<RejectedResponse> = Vec::new();
    for row in 0..dataset.len() {
        match h.extract(dataset, question, &columns, row, strictness) {
            Ok(x) => answers.push(x),
            Err(TabulationError::MalformedResponse { row, cell, .. }) => {
                warn!(
                    "read_question: rejecting the answer of row {} to {:?}: {:?}",
                    row, question.id, cell
                );
                rejected.push(RejectedResponse { row, cell });
                answers.push(None);
            }
            Err(e) => return Err(e),
        }
    }

    let mut model = ResponseModel {
        question: question.clone(),
        columns,
        statements: vec![],
        responses: vec![],
        rating_range: None,
    };
    let observed: Vec<&ResponseValue> = answers.iter().flatten().collect();
    h.domain(&mut model, &observed);
    debug!(
        "read_question: {:?}: statements: {:?} responses: {:?}",
        question.id, model.statements, model.responses
    );
    Ok(QuestionResponses {
        model,
        answers,
        rejected,
    })
}

/// The domain of a question.
pub fn response_model(
    dataset: &Dataset,
    question: &Question,
    strictness: Strictness,
) -> Result<ResponseModel, TabulationError> {
    read_question(dataset, question, strictness).map(|qr| qr.model)
}

/// The answer of one respondent, `None` if unanswered.
///
/// In strict mode, a malformed grid cell is returned as an error.
pub fn response_for(
    dataset: &Dataset,
    model: &ResponseModel,
    row: usize,
    strictness: Strictness,
) -> Result<Option<ResponseValue>, TabulationError> {
    handler(model.question.kind).extract(dataset, &model.question, &model.columns, row, strictness)
}

fn push_unique(seen: &mut HashSet<String>, l: &mut Vec<String>, s: &str) {
    if !seen.contains(s) {
        seen.insert(s.to_string());
        l.push(s.to_string());
    }
}

fn single_cell<'a>(dataset: &'a Dataset, columns: &[usize], row: usize) -> Option<&'a str> {
    columns.first().and_then(|c| dataset.value(row, *c))
}

fn response_rows(model: &ResponseModel, counts: &[u64], denominator: u64) -> Vec<TableRow> {
    model
        .responses
        .iter()
        .zip(counts.iter())
        .map(|(r, c)| TableRow {
            statement: None,
            label: RowLabel::Response(r.clone()),
            count: Some(*c),
            value: Statistic::ratio(*c as f64, denominator as f64),
        })
        .collect()
}

struct SingleHandler;

impl KindHandler for SingleHandler {
    fn extract(
        &self,
        dataset: &Dataset,
        _question: &Question,
        columns: &[usize],
        row: usize,
        _strictness: Strictness,
    ) -> Result<Option<ResponseValue>, TabulationError> {
        Ok(single_cell(dataset, columns, row).map(|s| ResponseValue::Single(s.to_string())))
    }

    fn domain(&self, model: &mut ResponseModel, answers: &[&ResponseValue]) {
        let mut seen: HashSet<String> = HashSet::new();
        for a in answers {
            if let ResponseValue::Single(s) = a {
                push_unique(&mut seen, &mut model.responses, s);
            }
        }
    }

    fn aggregate(
        &self,
        model: &ResponseModel,
        counts: &[Vec<u64>],
        denominator: u64,
    ) -> Vec<TableRow> {
        response_rows(model, &counts[0], denominator)
    }
}

struct MultiSelectHandler;

impl KindHandler for MultiSelectHandler {
    fn locate(&self, dataset: &Dataset, question: &Question) -> Vec<usize> {
        dataset.columns_containing(&question.id)
    }

    fn extract(
        &self,
        dataset: &Dataset,
        _question: &Question,
        columns: &[usize],
        row: usize,
        _strictness: Strictness,
    ) -> Result<Option<ResponseValue>, TabulationError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut selected: Vec<String> = Vec::new();
        for c in columns {
            if let Some(s) = dataset.value(row, *c) {
                let t = s.trim();
                if !t.is_empty() {
                    push_unique(&mut seen, &mut selected, t);
                }
            }
        }
        if selected.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ResponseValue::Multi(selected)))
        }
    }

    fn domain(&self, model: &mut ResponseModel, answers: &[&ResponseValue]) {
        let mut seen: HashSet<String> = HashSet::new();
        for a in answers {
            if let ResponseValue::Multi(l) = a {
                for s in l {
                    push_unique(&mut seen, &mut model.responses, s);
                }
            }
        }
    }

    fn aggregate(
        &self,
        model: &ResponseModel,
        counts: &[Vec<u64>],
        denominator: u64,
    ) -> Vec<TableRow> {
        response_rows(model, &counts[0], denominator)
    }
}

/// Reads a grid cell. `check_value` returns the canonical form of a value, or
/// `None` if the value is not acceptable for this kind of grid.
fn extract_grid(
    dataset: &Dataset,
    question: &Question,
    columns: &[usize],
    row: usize,
    strictness: Strictness,
    check_value: fn(&str) -> Option<String>,
) -> Result<Option<ResponseValue>, TabulationError> {
    let cell = match single_cell(dataset, columns, row) {
        Some(c) => c,
        None => return Ok(None),
    };
    let decoded = codec::decode(cell);
    let mut malformed = decoded.malformed;
    let mut entries: Vec<(String, String)> = Vec::new();
    for (statement, value) in decoded.entries {
        match check_value(&value) {
            Some(v) => {
                // The last occurrence of a statement wins.
                entries.retain(|(s, _)| *s != statement);
                entries.push((statement, v));
            }
            None => malformed.push(format!("{}{} {}", statement, codec::KEY_SEPARATOR, value)),
        }
    }
    if !malformed.is_empty() {
        match strictness {
            Strictness::Strict => {
                return Err(TabulationError::MalformedResponse {
                    question: question.id.clone(),
                    row,
                    cell: cell.to_string(),
                })
            }
            Strictness::Lenient => {
                debug!(
                    "extract_grid: row {}: dropping malformed items {:?}",
                    row, malformed
                );
            }
        }
    }
    if entries.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ResponseValue::Keyed(entries)))
    }
}

fn grid_statements(model: &mut ResponseModel, answers: &[&ResponseValue]) {
    let mut seen: HashSet<String> = HashSet::new();
    for a in answers {
        if let ResponseValue::Keyed(entries) = a {
            for (s, _) in entries {
                push_unique(&mut seen, &mut model.statements, s);
            }
        }
    }
}

struct MatrixHandler;

impl KindHandler for MatrixHandler {
    fn extract(
        &self,
        dataset: &Dataset,
        question: &Question,
        columns: &[usize],
        row: usize,
        strictness: Strictness,
    ) -> Result<Option<ResponseValue>, TabulationError> {
        extract_grid(dataset, question, columns, row, strictness, |v| {
            Some(v.to_string())
        })
    }

    fn domain(&self, model: &mut ResponseModel, answers: &[&ResponseValue]) {
        grid_statements(model, answers);
        let mut seen: HashSet<String> = HashSet::new();
        for a in answers {
            if let ResponseValue::Keyed(entries) = a {
                for (_, v) in entries {
                    push_unique(&mut seen, &mut model.responses, v);
                }
            }
        }
    }

    fn aggregate(
        &self,
        model: &ResponseModel,
        counts: &[Vec<u64>],
        denominator: u64,
    ) -> Vec<TableRow> {
        let mut res: Vec<TableRow> = Vec::new();
        for (statement, statement_counts) in model.statements.iter().zip(counts.iter()) {
            for row in response_rows(model, statement_counts, denominator) {
                res.push(TableRow {
                    statement: Some(statement.clone()),
                    ..row
                });
            }
        }
        res
    }
}

struct RankHandler;

impl RankHandler {
    /// Rank 1 is the best. The reported score is inverted so that a higher
    /// score means more important: with N statements, rank r scores N - r + 1.
    fn flip(num_statements: usize, rank: i64) -> i64 {
        num_statements as i64 - rank + 1
    }
}

impl KindHandler for RankHandler {
    fn extract(
        &self,
        dataset: &Dataset,
        question: &Question,
        columns: &[usize],
        row: usize,
        strictness: Strictness,
    ) -> Result<Option<ResponseValue>, TabulationError> {
        extract_grid(dataset, question, columns, row, strictness, |v| {
            parse_whole_number(v).map(|r| r.to_string())
        })
    }

    fn domain(&self, model: &mut ResponseModel, answers: &[&ResponseValue]) {
        grid_statements(model, answers);
        let mut ranks: Vec<i64> = answers
            .iter()
            .flat_map(|a| match a {
                ResponseValue::Keyed(entries) => entries
                    .iter()
                    .filter_map(|(_, v)| v.parse::<i64>().ok())
                    .collect::<Vec<i64>>(),
                _ => vec![],
            })
            .collect::<HashSet<i64>>()
            .into_iter()
            .collect();
        ranks.sort_unstable();
        model.responses = ranks.iter().map(|r| r.to_string()).collect();
    }

    fn aggregate(
        &self,
        model: &ResponseModel,
        counts: &[Vec<u64>],
        _denominator: u64,
    ) -> Vec<TableRow> {
        let n = model.statements.len();
        let ranks: Vec<i64> = model
            .responses
            .iter()
            .map(|r| r.parse::<i64>().unwrap_or_default())
            .collect();
        model
            .statements
            .iter()
            .zip(counts.iter())
            .map(|(statement, statement_counts)| {
                let total: u64 = statement_counts.iter().sum();
                let weighted: f64 = ranks
                    .iter()
                    .zip(statement_counts.iter())
                    .map(|(r, c)| (RankHandler::flip(n, *r) * (*c as i64)) as f64)
                    .sum();
                TableRow {
                    statement: Some(statement.clone()),
                    label: RowLabel::Average,
                    count: Some(total),
                    value: Statistic::ratio(weighted, total as f64),
                }
            })
            .collect()
    }
}

/// Slider ratings beyond this magnitude are not counted. This bounds the
/// number of rating rows of a table.
pub const MAX_SLIDER_RATING: i64 = 10_000;

struct SliderHandler;

impl KindHandler for SliderHandler {
    fn extract(
        &self,
        dataset: &Dataset,
        question: &Question,
        columns: &[usize],
        row: usize,
        _strictness: Strictness,
    ) -> Result<Option<ResponseValue>, TabulationError> {
        let cell = match single_cell(dataset, columns, row) {
            Some(c) => c,
            None => return Ok(None),
        };
        match cell.trim().parse::<f64>() {
            Ok(f) if f.is_finite() && f.abs() <= MAX_SLIDER_RATING as f64 => {
                Ok(Some(ResponseValue::Rating(f)))
            }
            Ok(f) if f.is_finite() => {
                warn!(
                    "slider {:?}: row {}: ignoring out of range value {:?}",
                    question.id, row, cell
                );
                Ok(None)
            }
            _ => {
                warn!(
                    "slider {:?}: row {}: ignoring non numeric value {:?}",
                    question.id, row, cell
                );
                Ok(None)
            }
        }
    }

    fn domain(&self, model: &mut ResponseModel, answers: &[&ResponseValue]) {
        // Only whole ratings are categories.
        let ratings: Vec<i64> = answers
            .iter()
            .filter_map(|a| match a {
                ResponseValue::Rating(f) if f.fract() == 0.0 => Some(*f as i64),
                _ => None,
            })
            .collect();
        if let (Some(min), Some(max)) = (ratings.iter().min(), ratings.iter().max()) {
            model.rating_range = Some((*min, *max));
            model.responses = (*min..=*max).map(|r| r.to_string()).collect();
        }
    }

    fn aggregate(
        &self,
        model: &ResponseModel,
        counts: &[Vec<u64>],
        denominator: u64,
    ) -> Vec<TableRow> {
        let (min, _) = match model.rating_range {
            Some(r) => r,
            None => return vec![],
        };
        let counts = &counts[0];
        let mut res: Vec<TableRow> = counts
            .iter()
            .enumerate()
            .map(|(idx, c)| TableRow {
                statement: None,
                label: RowLabel::Rating(min + idx as i64),
                count: Some(*c),
                value: Statistic::ratio(*c as f64, denominator as f64),
            })
            .collect();
        let total: u64 = counts.iter().sum();
        let weighted: f64 = counts
            .iter()
            .enumerate()
            .map(|(idx, c)| (min + idx as i64) as f64 * (*c as f64))
            .sum();
        res.push(TableRow {
            statement: None,
            label: RowLabel::Average,
            count: None,
            value: Statistic::ratio(weighted, total as f64),
        });
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DatasetBuilder;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let cols: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        let mut b = DatasetBuilder::new(&cols).unwrap();
        for r in rows {
            b.add_row_simple(r).unwrap();
        }
        b.build()
    }

    fn strings(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_question() {
        let ds = dataset(&["Q1"], &[&["Yes"]]);
        for kind in [
            QuestionKind::Single,
            QuestionKind::MultiSelect,
            QuestionKind::Matrix,
            QuestionKind::Rank,
            QuestionKind::Slider,
        ] {
            let res = response_model(&ds, &Question::new("Q2", kind), Strictness::Lenient);
            assert_eq!(
                res,
                Err(TabulationError::UnknownQuestion {
                    question: "Q2".to_string()
                })
            );
        }
    }

    #[test]
    fn single_domain_in_order_of_appearance() {
        let ds = dataset(&["Q1"], &[&["No"], &["Yes"], &[""], &["No"]]);
        let q = Question::new("Q1", QuestionKind::Single);
        let m = response_model(&ds, &q, Strictness::Lenient).unwrap();
        assert_eq!(m.responses, strings(&["No", "Yes"]));
        assert_eq!(
            response_for(&ds, &m, 1, Strictness::Lenient),
            Ok(Some(ResponseValue::Single("Yes".to_string())))
        );
        assert_eq!(response_for(&ds, &m, 2, Strictness::Lenient), Ok(None));
    }

    #[test]
    fn multi_select_columns_and_values() {
        let ds = dataset(
            &["Q6 Pick all - 1", "Gender", "Q6 Pick all - 2", "Q6 Pick all - 3"],
            &[
                &["Tea ", "Male", "Coffee", " Tea"],
                &["", "Female", "", ""],
                &["Water", "Female", "", ""],
            ],
        );
        let q = Question::new("Q6 Pick all", QuestionKind::MultiSelect);
        let m = response_model(&ds, &q, Strictness::Lenient).unwrap();
        assert_eq!(m.columns, vec![0, 2, 3]);
        assert_eq!(m.responses, strings(&["Tea", "Coffee", "Water"]));
        assert_eq!(
            response_for(&ds, &m, 0, Strictness::Lenient),
            Ok(Some(ResponseValue::Multi(strings(&["Tea", "Coffee"]))))
        );
        assert_eq!(response_for(&ds, &m, 1, Strictness::Lenient), Ok(None));
    }

    #[test]
    fn matrix_lenient_and_strict() {
        let ds = dataset(
            &["Q3"],
            &[
                &["Price: Agree | Quality: Disagree"],
                &["Price: Neutral | garbage"],
                &[""],
            ],
        );
        let q = Question::new("Q3", QuestionKind::Matrix);

        let lenient = read_question(&ds, &q, Strictness::Lenient).unwrap();
        assert_eq!(lenient.model.statements, strings(&["Price", "Quality"]));
        assert_eq!(
            lenient.model.responses,
            strings(&["Agree", "Disagree", "Neutral"])
        );
        assert_eq!(
            lenient.answers[1],
            Some(ResponseValue::Keyed(vec![(
                "Price".to_string(),
                "Neutral".to_string()
            )]))
        );
        assert!(lenient.rejected.is_empty());

        let strict = read_question(&ds, &q, Strictness::Strict).unwrap();
        assert_eq!(strict.answers[1], None);
        assert_eq!(
            strict.rejected,
            vec![RejectedResponse {
                row: 1,
                cell: "Price: Neutral | garbage".to_string()
            }]
        );
        assert_eq!(strict.model.responses, strings(&["Agree", "Disagree"]));
        assert!(matches!(
            response_for(&ds, &strict.model, 1, Strictness::Strict),
            Err(TabulationError::MalformedResponse { row: 1, .. })
        ));
    }

    #[test]
    fn rank_values_sorted_numerically() {
        let ds = dataset(
            &["Rank these"],
            &[
                &["A: 10 | B: 2 | C: 1"],
                &["A: 1.0 | B: first | C: 3"],
            ],
        );
        let q = Question::new("Rank these", QuestionKind::Rank);
        let qr = read_question(&ds, &q, Strictness::Lenient).unwrap();
        assert_eq!(qr.model.responses, strings(&["1", "2", "3", "10"]));
        assert_eq!(
            qr.answers[1],
            Some(ResponseValue::Keyed(vec![
                ("A".to_string(), "1".to_string()),
                ("C".to_string(), "3".to_string())
            ]))
        );
        let strict = read_question(&ds, &q, Strictness::Strict).unwrap();
        assert_eq!(strict.rejected.len(), 1);
    }

    #[test]
    fn rank_flip() {
        assert_eq!(RankHandler::flip(3, 1), 3);
        assert_eq!(RankHandler::flip(3, 2), 2);
        assert_eq!(RankHandler::flip(3, 3), 1);
    }

    #[test]
    fn slider_dense_range() {
        let ds = dataset(&["How much?"], &[&["2"], &["4.0"], &["5"], &["4.5"], &["lots"]]);
        let q = Question::new("How much?", QuestionKind::Slider);
        let qr = read_question(&ds, &q, Strictness::Lenient).unwrap();
        assert_eq!(qr.model.rating_range, Some((2, 5)));
        assert_eq!(qr.model.responses, strings(&["2", "3", "4", "5"]));
        assert_eq!(
            qr.model.positions(&ResponseValue::Rating(4.0)),
            vec![(0, 2)]
        );
        assert!(qr
            .model
            .positions(&ResponseValue::Rating(4.5))
            .is_empty());
        assert_eq!(qr.answers[4], None);
    }

    #[test]
    fn slider_ignores_extreme_ratings() {
        let ds = dataset(
            &["How much?"],
            &[&["-9e18"], &["9e18"], &["3"], &["99999999999"], &["10000"], &["-1"]],
        );
        let q = Question::new("How much?", QuestionKind::Slider);
        let qr = read_question(&ds, &q, Strictness::Lenient).unwrap();
        assert_eq!(qr.answers[0], None);
        assert_eq!(qr.answers[1], None);
        assert_eq!(qr.answers[3], None);
        assert_eq!(qr.answers[4], Some(ResponseValue::Rating(10_000.0)));
        assert_eq!(qr.model.rating_range, Some((-1, MAX_SLIDER_RATING)));
        assert_eq!(qr.model.responses.len(), 10_002);
        assert!(qr.rejected.is_empty());
    }

    #[test]
    fn empty_column_has_empty_domain() {
        let ds = dataset(&["Q1", "Q2"], &[&["", "x"], &["", "y"]]);
        for kind in [QuestionKind::Single, QuestionKind::Matrix, QuestionKind::Slider] {
            let m = response_model(&ds, &Question::new("Q1", kind), Strictness::Lenient).unwrap();
            assert!(m.responses.is_empty());
            assert!(m.statements.is_empty());
        }
    }
}
