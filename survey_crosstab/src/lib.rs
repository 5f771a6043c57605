mod codec;
mod config;
mod demographics;
mod extract;

pub mod assemble;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::HashMap;

pub use crate::codec::{decode as decode_grid_cell, encode as encode_grid_cell, GridCell};
pub use crate::config::*;
pub use crate::demographics::{
    collapse_uk_region, parse_whole_number, Classifier, DemographicProfile, UK_REGIONS,
};
pub use crate::extract::{
    read_question, response_for, response_model, QuestionResponses, ResponseModel, ResponseValue,
    MAX_SLIDER_RATING,
};

/// A dataset ready to be tabulated.
///
/// The demographic profile of every respondent is computed once, when the
/// survey is created, and shared by all the tabulations.
#[derive(Debug, Clone)]
pub struct Survey<'a> {
    dataset: &'a Dataset,
    rules: TabulationRules,
    classifier: Classifier,
    profiles: Vec<DemographicProfile>,
}

impl<'a> Survey<'a> {
    pub fn new(dataset: &'a Dataset, rules: &TabulationRules) -> Result<Survey<'a>, TabulationError> {
        if dataset.columns().is_empty() {
            return Err(TabulationError::EmptyDataset);
        }
        let classifier = Classifier::new(dataset, rules.reference_year);
        let profiles = classifier.classify_all(dataset);
        info!(
            "Survey: {} respondents, {} columns, rules: {:?}",
            dataset.len(),
            dataset.columns().len(),
            rules
        );
        Ok(Survey {
            dataset,
            rules: rules.clone(),
            classifier,
            profiles,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn rules(&self) -> &TabulationRules {
        &self.rules
    }

    pub fn profiles(&self) -> &[DemographicProfile] {
        &self.profiles
    }

    /// The valid segments of a dimension, in report order.
    pub fn segments_for(&self, dimension: Dimension) -> Vec<String> {
        self.classifier.segments(&self.profiles, dimension)
    }

    /// Reads the answers to a question, following the strictness of the rules.
    pub fn read(&self, question: &Question) -> Result<QuestionResponses, TabulationError> {
        read_question(self.dataset, question, self.rules.strictness)
    }

    /// Tabulates one question along one dimension.
    pub fn tabulate(
        &self,
        question: &Question,
        dimension: Dimension,
    ) -> Result<SegmentTable, TabulationError> {
        let responses = self.read(question)?;
        Ok(self.tabulate_responses(&responses, dimension))
    }

    /// Tabulates answers that have already been read, which avoids reading them
    /// again for every dimension.
    pub fn tabulate_responses(
        &self,
        responses: &QuestionResponses,
        dimension: Dimension,
    ) -> SegmentTable {
        let model = &responses.model;
        let segments = self.segments_for(dimension);
        let segment_idxs: HashMap<&str, usize> = segments
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.as_str(), idx))
            .collect();

        // Dense counts: [segment][statement][response]
        let mut counts: Vec<Vec<Vec<u64>>> =
            vec![vec![vec![0; model.responses.len()]; model.statement_slots()]; segments.len()];
        let mut denominators: Vec<u64> = vec![0; segments.len()];

        for (row, profile) in self.profiles.iter().enumerate() {
            let seg_idx = match profile
                .segment(dimension)
                .and_then(|s| segment_idxs.get(s.as_str()).cloned())
            {
                Some(idx) => idx,
                None => continue,
            };
            let positions = responses
                .answers
                .get(row)
                .and_then(|a| a.as_ref())
                .map(|a| model.positions(a))
                .unwrap_or_default();
            let mut counted = false;
            for (s_idx, r_idx) in positions {
                if let Some(c) = counts[seg_idx]
                    .get_mut(s_idx)
                    .and_then(|l| l.get_mut(r_idx))
                {
                    *c += 1;
                    counted = true;
                }
            }
            let in_denominator = match self.rules.denominator_mode {
                DenominatorMode::Respondents => counted,
                DenominatorMode::AllRecords => true,
            };
            if in_denominator {
                denominators[seg_idx] += 1;
            }
        }

        let h = extract::handler(model.question.kind);
        let stats: Vec<SegmentStats> = segments
            .iter()
            .enumerate()
            .map(|(idx, segment)| {
                if denominators[idx] == 0 {
                    debug!(
                        "tabulate: {:?} / {}: no respondent in segment {:?}",
                        model.question.id,
                        dimension.name(),
                        segment
                    );
                }
                SegmentStats {
                    segment: segment.clone(),
                    respondents: denominators[idx],
                    rows: h.aggregate(model, &counts[idx], denominators[idx]),
                }
            })
            .collect();

        info!(
            "tabulate: {:?} ({}) by {}: {} segments",
            model.question.id,
            model.question.kind.name(),
            dimension.name(),
            stats.len()
        );
        SegmentTable {
            question: model.question.id.clone(),
            kind: model.question.kind,
            dimension,
            statements: model.statements.clone(),
            responses: model.responses.clone(),
            segments: stats,
            rejected: responses.rejected.clone(),
        }
    }
}

/// Tabulates one question along one dimension.
///
/// Arguments:
/// * `dataset` the answers of all the respondents
/// * `question` the question, with its kind
/// * `dimension` the demographic dimension that splits the respondents
/// * `rules` the rules that govern this tabulation
///
/// When tabulating several questions or dimensions over the same dataset, a
/// [`Survey`] avoids classifying the respondents again for every table.
pub fn tabulate(
    dataset: &Dataset,
    question: &Question,
    dimension: Dimension,
    rules: &TabulationRules,
) -> Result<SegmentTable, TabulationError> {
    Survey::new(dataset, rules)?.tabulate(question, dimension)
}

/// The valid segments of a dimension for this dataset.
pub fn segments_for(dataset: &Dataset, dimension: Dimension, reference_year: i32) -> Vec<String> {
    let classifier = Classifier::new(dataset, reference_year);
    classifier.segments(&classifier.classify_all(dataset), dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DatasetBuilder;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let cols: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        let mut b = DatasetBuilder::new(&cols).unwrap();
        for r in rows {
            b.add_row_simple(r).unwrap();
        }
        b.build()
    }

    fn rules() -> TabulationRules {
        TabulationRules::new(2025)
    }

    fn close(x: Statistic, y: f64) -> bool {
        match x {
            Statistic::Value(v) => (v - y).abs() < 1e-9,
            Statistic::NoData => false,
        }
    }

    fn row<'a>(stats: &'a SegmentStats, statement: Option<&str>, label: &RowLabel) -> &'a TableRow {
        stats
            .rows
            .iter()
            .find(|r| r.statement.as_deref() == statement && r.label == *label)
            .unwrap()
    }

    fn response(s: &str) -> RowLabel {
        RowLabel::Response(s.to_string())
    }

    fn sample() -> Dataset {
        dataset(
            &["Gender", "Year Of Birth", "UK Region", "Q1", "Q2 - a", "Q2 - b"],
            &[
                &["Female", "2000", "London", "Yes", "Tea", "Coffee"],
                &["Male", "1990", "Wales", "No", "Tea", ""],
                &["Female", "1970", "Atlantis", "Yes", "", ""],
                &["Male", "1950", "North East (England", "", "Coffee", ""],
                &["Female", "1940", "Scotland", "No", "", "Tea"],
            ],
        )
    }

    #[test]
    fn four_respondents_no_demographics() {
        init();
        let ds = dataset(&["Q1"], &[&["Yes"], &["No"], &["Yes"], &["No"]]);
        let q = Question::new("Q1", QuestionKind::Single);
        let t = tabulate(&ds, &q, Dimension::Overall, &rules()).unwrap();
        assert_eq!(t.segments.len(), 1);
        let s = &t.segments[0];
        assert_eq!(s.segment, OVERALL_SEGMENT);
        assert_eq!(s.respondents, 4);
        assert_eq!(
            s.rows,
            vec![
                TableRow {
                    statement: None,
                    label: response("Yes"),
                    count: Some(2),
                    value: Statistic::Value(0.5)
                },
                TableRow {
                    statement: None,
                    label: response("No"),
                    count: Some(2),
                    value: Statistic::Value(0.5)
                },
            ]
        );
        for d in [Dimension::Gender, Dimension::Region] {
            let t = tabulate(&ds, &q, d, &rules()).unwrap();
            assert!(t.is_empty());
            assert!(t.segments.is_empty());
        }
        // The generations are listed even without any birth information.
        let t = tabulate(&ds, &q, Dimension::Generation, &rules()).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.segments.len(), 4);
        assert!(t.segments.iter().all(|s| s.respondents == 0));
    }

    #[test]
    fn single_percentages_sum_to_one() {
        init();
        let ds = sample();
        let survey = Survey::new(&ds, &rules()).unwrap();
        let q = Question::new("Q1", QuestionKind::Single);
        for d in Dimension::ALL {
            let t = survey.tabulate(&q, d).unwrap();
            for s in t.segments.iter().filter(|s| s.respondents > 0) {
                let total: f64 = s.rows.iter().filter_map(|r| r.value.value()).sum();
                assert!((total - 1.0).abs() < 1e-9, "{:?} {:?}", d, s);
            }
        }
    }

    fn full_sample() -> Dataset {
        dataset(
            &["Gender", "Age", "Education Level", "US Region", "Q1", "Grid", "Slide"],
            &[
                &["Female", "45", "College", "West", "Yes", "Price: Agree | Quality: Agree", "3"],
                &["Male", "23", "High school", "South", "No", "Price: Disagree | Quality: Agree", "5"],
                &["Female", "23", "College", "South", "No", "Price: Agree | Quality: Disagree", "1"],
                &["Male", "61", "Graduate", "West", "Yes", "Price: Agree | Quality: Agree", "5"],
                &["Female", "9", "High school", "Midwest", "Yes", "Price: Disagree | Quality: Disagree", "2"],
                &["Male", "34", "College", "Midwest", "No", "Price: Agree | Quality: Disagree", "4"],
            ],
        )
    }

    #[test]
    fn percentages_sum_to_one_for_all_kinds() {
        init();
        let ds = full_sample();
        let survey = Survey::new(&ds, &rules()).unwrap();
        let questions = [
            Question::new("Q1", QuestionKind::Single),
            Question::new("Grid", QuestionKind::Matrix),
            Question::new("Slide", QuestionKind::Slider),
        ];
        for q in questions.iter() {
            for d in Dimension::ALL {
                let t = survey.tabulate(q, d).unwrap();
                assert!(!t.segments.is_empty(), "{:?} {:?}", q, d);
                for s in t.segments.iter().filter(|s| s.respondents > 0) {
                    let slots: Vec<Option<&str>> = if t.statements.is_empty() {
                        vec![None]
                    } else {
                        t.statements.iter().map(|x| Some(x.as_str())).collect()
                    };
                    for slot in slots {
                        let total: f64 = s
                            .rows
                            .iter()
                            .filter(|r| r.statement.as_deref() == slot && r.label != RowLabel::Average)
                            .filter_map(|r| r.value.value())
                            .sum();
                        assert!(
                            (total - 1.0).abs() < 1e-9,
                            "{:?} {:?} {:?} {:?}",
                            q,
                            d,
                            slot,
                            s
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn age_and_education_segments() {
        init();
        let ds = full_sample();
        let survey = Survey::new(&ds, &rules()).unwrap();
        let q = Question::new("Q1", QuestionKind::Single);
        let t = survey.tabulate(&q, Dimension::Age).unwrap();
        let labels: Vec<&str> = t.segments.iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(labels, vec!["9", "23", "34", "45", "61"]);
        assert_eq!(t.segment("23").unwrap().respondents, 2);

        let t = survey.tabulate(&q, Dimension::Education).unwrap();
        let labels: Vec<&str> = t.segments.iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(labels, vec!["College", "High school", "Graduate"]);
        let college = t.segment("College").unwrap();
        assert_eq!(college.respondents, 3);
        assert!(close(row(college, None, &response("No")).value, 2.0 / 3.0));
    }

    #[test]
    fn extreme_slider_rating_does_not_abort() {
        init();
        let ds = dataset(&["Slide"], &[&["-9e18"], &["9e18"], &["3"]]);
        let q = Question::new("Slide", QuestionKind::Slider);
        let t = tabulate(&ds, &q, Dimension::Overall, &rules()).unwrap();
        assert_eq!(t.responses, vec!["3".to_string()]);
        let s = &t.segments[0];
        assert_eq!(s.respondents, 1);
        assert!(close(row(s, None, &RowLabel::Average).value, 3.0));
    }

    #[test]
    fn extreme_age_does_not_abort() {
        init();
        let ds = dataset(&["Age", "Q1"], &[&["-2147483648", "Yes"], &["30", "No"]]);
        let survey = Survey::new(&ds, &rules()).unwrap();
        let q = Question::new("Q1", QuestionKind::Single);
        let t = survey.tabulate(&q, Dimension::Generation).unwrap();
        assert_eq!(t.segment("Millennial").unwrap().respondents, 1);
        let total: u64 = t.segments.iter().map(|s| s.respondents).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn answers_from_a_shorter_dataset() {
        init();
        let short = dataset(&["Q1"], &[&["Yes"]]);
        let long = dataset(&["Q1"], &[&["Yes"], &["No"], &["No"]]);
        let q = Question::new("Q1", QuestionKind::Single);
        let responses = read_question(&short, &q, Strictness::Lenient).unwrap();
        let survey = Survey::new(&long, &rules()).unwrap();
        let t = survey.tabulate_responses(&responses, Dimension::Overall);
        let s = &t.segments[0];
        assert_eq!(s.respondents, 1);
        assert_eq!(row(s, None, &response("Yes")).count, Some(1));
    }

    #[test]
    fn generation_segments() {
        init();
        let ds = sample();
        let survey = Survey::new(&ds, &rules()).unwrap();
        let q = Question::new("Q1", QuestionKind::Single);
        let t = survey.tabulate(&q, Dimension::Generation).unwrap();
        let labels: Vec<&str> = t.segments.iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(labels, vec!["Gen Z", "Millennial", "Gen X", "Baby Boomer"]);
        // The Baby Boomer left Q1 empty. The respondent born in 1940 has no generation.
        let boomers = t.segment("Baby Boomer").unwrap();
        assert_eq!(boomers.respondents, 0);
        assert!(boomers.rows.iter().all(|r| r.value == Statistic::NoData));
        let total: u64 = t.segments.iter().map(|s| s.respondents).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn multi_select_denominator_counts_respondents() {
        init();
        let ds = sample();
        let q = Question::new("Q2 - ", QuestionKind::MultiSelect);
        let t = tabulate(&ds, &q, Dimension::Overall, &rules()).unwrap();
        let s = &t.segments[0];
        // Rows 0, 1, 3 and 4 selected something.
        assert_eq!(s.respondents, 4);
        let tea = row(s, None, &response("Tea"));
        assert_eq!(tea.count, Some(3));
        assert!(close(tea.value, 0.75));
        let coffee = row(s, None, &response("Coffee"));
        assert_eq!(coffee.count, Some(2));
        assert!(close(coffee.value, 0.5));
    }

    #[test]
    fn uk_regions_collapse() {
        init();
        let ds = sample();
        let q = Question::new("Q2 - ", QuestionKind::MultiSelect);
        let t = tabulate(&ds, &q, Dimension::Region, &rules()).unwrap();
        assert_eq!(t.segments.len(), 7);
        assert_eq!(t.segment("Northern England").unwrap().respondents, 1);
        assert_eq!(t.segment("Scotland").unwrap().respondents, 1);
        assert_eq!(t.segment("Midlands (England)").unwrap().respondents, 0);
        // Atlantis is not counted anywhere.
        let total: u64 = t.segments.iter().map(|s| s.respondents).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn legacy_denominators() {
        init();
        let ds = sample();
        let mut r = rules();
        r.denominator_mode = DenominatorMode::AllRecords;
        let q = Question::new("Q1", QuestionKind::Single);
        let t = tabulate(&ds, &q, Dimension::Overall, &r).unwrap();
        let s = &t.segments[0];
        assert_eq!(s.respondents, 5);
        assert!(close(row(s, None, &response("Yes")).value, 0.4));
    }

    #[test]
    fn matrix_denominator_counts_respondents_once() {
        init();
        let ds = dataset(
            &["Gender", "Q3"],
            &[
                &["Female", "Price: Agree | Quality: Agree"],
                &["Female", "Price: Disagree"],
                &["Male", "Quality: Disagree"],
                &["Male", ""],
            ],
        );
        let q = Question::new("Q3", QuestionKind::Matrix);
        let t = tabulate(&ds, &q, Dimension::Gender, &rules()).unwrap();
        assert_eq!(t.statements, vec!["Price".to_string(), "Quality".to_string()]);
        assert_eq!(t.responses, vec!["Agree".to_string(), "Disagree".to_string()]);

        let female = t.segment("Female").unwrap();
        assert_eq!(female.respondents, 2);
        assert_eq!(female.rows.len(), 4);
        assert!(close(row(female, Some("Price"), &response("Agree")).value, 0.5));
        assert!(close(row(female, Some("Quality"), &response("Agree")).value, 0.5));
        assert!(close(row(female, Some("Quality"), &response("Disagree")).value, 0.0));

        let male = t.segment("Male").unwrap();
        assert_eq!(male.respondents, 1);
        assert!(close(row(male, Some("Quality"), &response("Disagree")).value, 1.0));
    }

    #[test]
    fn rank_average_is_flipped() {
        init();
        let ds = dataset(
            &["Rank"],
            &[&["A: 1 | B: 2 | C: 3"], &["A: 1 | B: 3 | C: 2"]],
        );
        let q = Question::new("Rank", QuestionKind::Rank);
        let t = tabulate(&ds, &q, Dimension::Overall, &rules()).unwrap();
        let s = &t.segments[0];
        assert_eq!(s.respondents, 2);
        let a = row(s, Some("A"), &RowLabel::Average);
        assert_eq!(a.count, Some(2));
        assert!(close(a.value, 3.0));
        assert!(close(row(s, Some("B"), &RowLabel::Average).value, 1.5));
        assert!(close(row(s, Some("C"), &RowLabel::Average).value, 1.5));
    }

    #[test]
    fn rank_without_answers() {
        init();
        let ds = dataset(&["Gender", "Rank"], &[&["Female", "A: 1 | B: 2"], &["Male", ""]]);
        let q = Question::new("Rank", QuestionKind::Rank);
        let t = tabulate(&ds, &q, Dimension::Gender, &rules()).unwrap();
        let male = t.segment("Male").unwrap();
        assert_eq!(male.respondents, 0);
        assert_eq!(row(male, Some("A"), &RowLabel::Average).value, Statistic::NoData);
    }

    #[test]
    fn slider_dense_with_average() {
        init();
        let ds = dataset(&["Slider"], &[&["2"], &["4"], &["5"], &["4"]]);
        let q = Question::new("Slider", QuestionKind::Slider);
        let t = tabulate(&ds, &q, Dimension::Overall, &rules()).unwrap();
        let s = &t.segments[0];
        let labels: Vec<RowLabel> = s.rows.iter().map(|r| r.label.clone()).collect();
        assert_eq!(
            labels,
            vec![
                RowLabel::Rating(2),
                RowLabel::Rating(3),
                RowLabel::Rating(4),
                RowLabel::Rating(5),
                RowLabel::Average
            ]
        );
        assert_eq!(row(s, None, &RowLabel::Rating(3)).count, Some(0));
        assert!(close(row(s, None, &RowLabel::Rating(4)).value, 0.5));
        let avg = row(s, None, &RowLabel::Average);
        assert_eq!(avg.count, None);
        assert!(close(avg.value, 15.0 / 4.0));
        let total: f64 = s
            .rows
            .iter()
            .filter(|r| r.label != RowLabel::Average)
            .filter_map(|r| r.value.value())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn strict_rejections_are_recorded() {
        init();
        let ds = dataset(
            &["Q3"],
            &[&["Price: Agree"], &["Price: Agree | oops"], &["Price: Disagree"]],
        );
        let q = Question::new("Q3", QuestionKind::Matrix);
        let mut r = rules();
        r.strictness = Strictness::Strict;
        let t = tabulate(&ds, &q, Dimension::Overall, &r).unwrap();
        assert_eq!(t.rejected.len(), 1);
        assert_eq!(t.rejected[0].row, 1);
        assert_eq!(t.segments[0].respondents, 2);

        let lenient = tabulate(&ds, &q, Dimension::Overall, &rules()).unwrap();
        assert!(lenient.rejected.is_empty());
        assert_eq!(lenient.segments[0].respondents, 3);
    }

    #[test]
    fn empty_question_gives_empty_table() {
        init();
        let ds = dataset(&["Gender", "Q1"], &[&["Male", ""], &["Female", ""]]);
        let q = Question::new("Q1", QuestionKind::Slider);
        let t = tabulate(&ds, &q, Dimension::Gender, &rules()).unwrap();
        assert!(t.is_empty());
        assert!(t.segments.iter().all(|s| s.rows.is_empty()));
    }

    #[test]
    fn unknown_question_is_reported() {
        let ds = sample();
        let q = Question::new("Q9", QuestionKind::Single);
        assert_eq!(
            tabulate(&ds, &q, Dimension::Overall, &rules()),
            Err(TabulationError::UnknownQuestion {
                question: "Q9".to_string()
            })
        );
    }

    #[test]
    fn no_columns() {
        let ds = Dataset::default();
        assert!(matches!(
            Survey::new(&ds, &rules()),
            Err(TabulationError::EmptyDataset)
        ));
    }

    #[test]
    fn tabulation_is_deterministic() {
        let ds = sample();
        for (id, kind) in [
            ("Q1", QuestionKind::Single),
            ("Q2 - ", QuestionKind::MultiSelect),
        ] {
            let q = Question::new(id, kind);
            for d in Dimension::ALL {
                let t1 = tabulate(&ds, &q, d, &rules()).unwrap();
                let t2 = tabulate(&ds, &q, d, &rules()).unwrap();
                assert_eq!(t1, t2);
            }
        }
    }

    #[test]
    fn free_segments_for() {
        let ds = sample();
        assert_eq!(
            segments_for(&ds, Dimension::Gender, 2025),
            vec!["Female".to_string(), "Male".to_string()]
        );
    }
}
