//! Shaping of the tabulations into named tables, ready to be written out.

use log::{info, warn};
use std::fmt::Display;

use crate::config::*;
use crate::Survey;

/// One field of an output table.
#[derive(PartialEq, Debug, Clone)]
pub enum OutputCell {
    Text(String),
    Count(u64),
    Number(f64),
    /// No data: written as an empty field.
    Missing,
}

impl OutputCell {
    fn text(s: &str) -> OutputCell {
        OutputCell::Text(s.to_string())
    }

    fn statistic(s: Statistic) -> OutputCell {
        match s {
            Statistic::Value(v) => OutputCell::Number(v),
            Statistic::NoData => OutputCell::Missing,
        }
    }
}

impl Display for OutputCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputCell::Text(s) => write!(f, "{}", s),
            OutputCell::Count(c) => write!(f, "{}", c),
            OutputCell::Number(x) => write!(f, "{}", x),
            OutputCell::Missing => Ok(()),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct OutputTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<OutputCell>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Section {
    pub name: String,
    pub table: OutputTable,
}

/// The ordered sections of one output file.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Report {
    pub sections: Vec<Section>,
    /// The names of the sections that had nothing to show.
    pub skipped: Vec<String>,
}

impl Report {
    fn push(&mut self, name: String, table: Option<OutputTable>) {
        match table {
            Some(table) => self.sections.push(Section { name, table }),
            None => {
                info!("Report: nothing to emit for section {:?}", name);
                self.skipped.push(name);
            }
        }
    }
}

/// Everything that was produced for one question.
#[derive(PartialEq, Debug, Clone)]
pub struct QuestionReport {
    pub question: Question,
    /// False when the question is not in the dataset and was skipped.
    pub found: bool,
    /// The tabulations, one per dimension, in report order.
    pub tables: Vec<SegmentTable>,
    pub report: Report,
}

impl QuestionReport {
    /// The number of answers set aside because they could not be read.
    pub fn rejected(&self) -> usize {
        self.tables.first().map(|t| t.rejected.len()).unwrap_or(0)
    }
}

/// The dimensions of a report: always the overall one, then the requested
/// dimensions in canonical order, without duplicates.
pub fn report_dimensions(requested: &[Dimension]) -> Vec<Dimension> {
    Dimension::ALL
        .iter()
        .cloned()
        .filter(|d| *d == Dimension::Overall || requested.contains(d))
        .collect()
}

/// Shapes one tabulation. Returns `None` when the tabulation has nothing to show.
pub fn shape_table(table: &SegmentTable) -> Option<OutputTable> {
    if table.is_empty() {
        return None;
    }
    let segment_header = table.dimension.segment_header().to_string();
    let mut res = OutputTable::default();
    match table.kind {
        QuestionKind::Single | QuestionKind::MultiSelect => {
            res.header = vec![
                segment_header,
                "Response".to_string(),
                "Count".to_string(),
                "Percentage".to_string(),
            ];
            for s in table.segments.iter() {
                for r in s.rows.iter() {
                    if let RowLabel::Response(label) = &r.label {
                        res.rows.push(vec![
                            OutputCell::text(&s.segment),
                            OutputCell::text(label),
                            OutputCell::Count(r.count.unwrap_or(0)),
                            OutputCell::statistic(r.value),
                        ]);
                    }
                }
            }
        }
        QuestionKind::Matrix => {
            res.header = vec![segment_header, "Statement".to_string()];
            res.header.extend(table.responses.iter().cloned());
            for s in table.segments.iter() {
                for statement in table.statements.iter() {
                    let mut line = vec![OutputCell::text(&s.segment), OutputCell::text(statement)];
                    for response in table.responses.iter() {
                        let value = s
                            .rows
                            .iter()
                            .find(|r| {
                                r.statement.as_ref() == Some(statement)
                                    && r.label == RowLabel::Response(response.clone())
                            })
                            .map(|r| r.value)
                            .unwrap_or(Statistic::NoData);
                        line.push(OutputCell::statistic(value));
                    }
                    res.rows.push(line);
                }
            }
        }
        QuestionKind::Rank => {
            res.header = vec![
                segment_header,
                "Statement".to_string(),
                "Average".to_string(),
            ];
            for s in table.segments.iter() {
                for r in s.rows.iter() {
                    res.rows.push(vec![
                        OutputCell::text(&s.segment),
                        OutputCell::text(r.statement.as_deref().unwrap_or_default()),
                        OutputCell::statistic(r.value),
                    ]);
                }
            }
        }
        QuestionKind::Slider => {
            res.header = vec![
                segment_header,
                "Rating".to_string(),
                "Count".to_string(),
                "Percentage".to_string(),
            ];
            for s in table.segments.iter() {
                for r in s.rows.iter() {
                    let label = match &r.label {
                        RowLabel::Rating(x) => x.to_string(),
                        RowLabel::Average => "Average".to_string(),
                        RowLabel::Response(x) => x.clone(),
                    };
                    res.rows.push(vec![
                        OutputCell::text(&s.segment),
                        OutputCell::Text(label),
                        r.count.map(OutputCell::Count).unwrap_or(OutputCell::Missing),
                        OutputCell::statistic(r.value),
                    ]);
                }
            }
        }
    }
    Some(res)
}

/// Tabulates one question along the given dimensions (the overall dimension is
/// always included) and shapes the result.
///
/// When the question is not in the dataset, the unknown question policy of the
/// rules decides: either the error is returned, or an empty report is.
pub fn build_question_report(
    survey: &Survey,
    question: &Question,
    dimensions: &[Dimension],
) -> Result<QuestionReport, TabulationError> {
    let responses = match survey.read(question) {
        Ok(r) => r,
        Err(TabulationError::UnknownQuestion { question: id })
            if survey.rules().unknown_question_policy == UnknownQuestionPolicy::Skip =>
        {
            warn!("build_question_report: skipping unknown question {:?}", id);
            return Ok(QuestionReport {
                question: question.clone(),
                found: false,
                tables: vec![],
                report: Report::default(),
            });
        }
        Err(e) => return Err(e),
    };

    let mut tables: Vec<SegmentTable> = Vec::new();
    let mut report = Report::default();
    for d in report_dimensions(dimensions) {
        let table = survey.tabulate_responses(&responses, d);
        report.push(d.section_name(), shape_table(&table));
        tables.push(table);
    }
    Ok(QuestionReport {
        question: question.clone(),
        found: true,
        tables,
        report,
    })
}

/// The number of respondents in every segment of the demographic dimensions.
///
/// Sections are named after the dimension. A dimension without any classified
/// respondent is skipped.
pub fn demographic_summary(survey: &Survey) -> Report {
    let mut report = Report::default();
    for d in [
        Dimension::Gender,
        Dimension::Age,
        Dimension::Generation,
        Dimension::Education,
        Dimension::Region,
    ] {
        let segments = survey.segments_for(d);
        let counts: Vec<u64> = segments
            .iter()
            .map(|s| {
                survey
                    .profiles()
                    .iter()
                    .filter(|p| p.segment(d).as_ref() == Some(s))
                    .count() as u64
            })
            .collect();
        let table = if counts.iter().all(|c| *c == 0) {
            None
        } else {
            Some(OutputTable {
                header: vec![d.name().to_string(), "Count".to_string()],
                rows: segments
                    .iter()
                    .zip(counts.iter())
                    .map(|(s, c)| vec![OutputCell::text(s), OutputCell::Count(*c)])
                    .collect(),
            })
        };
        report.push(d.name().to_string(), table);
    }
    report
}
