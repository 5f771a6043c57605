//! Derivation of the demographic attributes of each respondent, and of the
//! segments available along each dimension.

use log::debug;
use std::collections::HashSet;

use crate::config::*;

pub const GENDER_COLUMN: &str = "Gender";
pub const AGE_COLUMN: &str = "Age";
pub const YEAR_OF_BIRTH_COLUMN: &str = "Year Of Birth";
pub const US_REGION_COLUMN: &str = "US Region";
pub const UK_REGION_COLUMN: &str = "UK Region";
pub const EDUCATION_COLUMN: &str = "Education Level";

/// The regions that UK sub-regions collapse into, in report order.
pub const UK_REGIONS: [&str; 7] = [
    "London",
    "Northern England",
    "Midlands (England)",
    "Southern England",
    "Scotland",
    "Wales",
    "Northern Ireland",
];

// The survey provider exports "North East (England" without its closing
// parenthesis. Both spellings are accepted.
const UK_SUBREGIONS: [(&str, &str); 13] = [
    ("London", "London"),
    ("North East (England", "Northern England"),
    ("North East (England)", "Northern England"),
    ("North West (England)", "Northern England"),
    ("Yorkshire And The Humber", "Northern England"),
    ("West Midlands (England)", "Midlands (England)"),
    ("East Midlands (England)", "Midlands (England)"),
    ("South East (England)", "Southern England"),
    ("East Of England", "Southern England"),
    ("South West (England)", "Southern England"),
    ("Scotland", "Scotland"),
    ("Wales", "Wales"),
    ("Northern Ireland", "Northern Ireland"),
];

/// Maps a UK sub-region to its region. Unknown sub-regions have no region.
pub fn collapse_uk_region(subregion: &str) -> Option<&'static str> {
    UK_SUBREGIONS
        .iter()
        .find(|(sub, _)| *sub == subregion)
        .map(|(_, region)| *region)
}

/// The derived attributes of one respondent.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DemographicProfile {
    pub gender: Option<String>,
    pub generation: Option<Generation>,
    pub age: Option<i32>,
    pub region: Option<String>,
    pub education: Option<String>,
}

impl DemographicProfile {
    /// The segment of this respondent along the given dimension, if any.
    pub fn segment(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Overall => Some(OVERALL_SEGMENT.to_string()),
            Dimension::Gender => self.gender.clone(),
            Dimension::Generation => self.generation.map(|g| g.label().to_string()),
            Dimension::Age => self.age.map(|a| a.to_string()),
            Dimension::Region => self.region.clone(),
            Dimension::Education => self.education.clone(),
        }
    }
}

/// Where the region of a respondent comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum RegionSource {
    Us(usize),
    Uk(usize),
    Missing,
}

/// Where the generation of a respondent comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum BirthSource {
    YearOfBirth(usize),
    Age(usize),
    Missing,
}

/// Classifies the respondents of one dataset.
///
/// The demographic columns are looked up once, when the classifier is created.
#[derive(Debug, Clone)]
pub struct Classifier {
    reference_year: i32,
    gender: Option<usize>,
    age: Option<usize>,
    education: Option<usize>,
    birth: BirthSource,
    region: RegionSource,
}

impl Classifier {
    pub fn new(dataset: &Dataset, reference_year: i32) -> Classifier {
        let birth = match (
            dataset.column_index(YEAR_OF_BIRTH_COLUMN),
            dataset.column_index(AGE_COLUMN),
        ) {
            (Some(idx), _) => BirthSource::YearOfBirth(idx),
            (None, Some(idx)) => BirthSource::Age(idx),
            (None, None) => BirthSource::Missing,
        };
        let region = match (
            dataset.column_index(US_REGION_COLUMN),
            dataset.column_index(UK_REGION_COLUMN),
        ) {
            (Some(idx), _) => RegionSource::Us(idx),
            (None, Some(idx)) => RegionSource::Uk(idx),
            (None, None) => RegionSource::Missing,
        };
        let c = Classifier {
            reference_year,
            gender: dataset.column_index(GENDER_COLUMN),
            age: dataset.column_index(AGE_COLUMN),
            education: dataset.column_index(EDUCATION_COLUMN),
            birth,
            region,
        };
        debug!("Classifier::new: {:?}", c);
        c
    }

    pub fn classify(&self, dataset: &Dataset, row: usize) -> DemographicProfile {
        let cell = |col: Option<usize>| col.and_then(|c| dataset.value(row, c));

        let age = cell(self.age).and_then(parse_whole_number);
        let generation = match self.birth {
            BirthSource::YearOfBirth(col) => dataset
                .value(row, col)
                .and_then(parse_whole_number)
                .and_then(Generation::from_birth_year),
            BirthSource::Age(col) => dataset
                .value(row, col)
                .and_then(parse_whole_number)
                .and_then(|a| self.reference_year.checked_sub(a))
                .and_then(Generation::from_birth_year),
            BirthSource::Missing => None,
        };
        let region = match self.region {
            RegionSource::Us(col) => dataset.value(row, col).map(|s| s.to_string()),
            RegionSource::Uk(col) => dataset
                .value(row, col)
                .and_then(collapse_uk_region)
                .map(|s| s.to_string()),
            RegionSource::Missing => None,
        };

        DemographicProfile {
            gender: cell(self.gender).map(|s| s.to_string()),
            generation,
            age,
            region,
            education: cell(self.education).map(|s| s.to_string()),
        }
    }

    /// The profiles of all the respondents, in row order.
    pub fn classify_all(&self, dataset: &Dataset) -> Vec<DemographicProfile> {
        (0..dataset.len())
            .map(|row| self.classify(dataset, row))
            .collect()
    }

    /// The valid segments along a dimension.
    ///
    /// Generations and UK regions are fixed lists, even if some of their segments
    /// have no respondent. This holds for generations even without any `Year Of Birth`
    /// or `Age` column: all the segments are then empty. The other dimensions list
    /// the values observed in the profiles: ages in increasing order, everything
    /// else in order of appearance.
    pub fn segments(&self, profiles: &[DemographicProfile], dimension: Dimension) -> Vec<String> {
        match dimension {
            Dimension::Overall => vec![OVERALL_SEGMENT.to_string()],
            Dimension::Generation => Generation::ALL
                .iter()
                .map(|g| g.label().to_string())
                .collect(),
            Dimension::Region => match self.region {
                RegionSource::Uk(_) => UK_REGIONS.iter().map(|s| s.to_string()).collect(),
                RegionSource::Us(_) => observed(profiles, dimension),
                RegionSource::Missing => vec![],
            },
            Dimension::Age => {
                let mut ages: Vec<i32> = profiles
                    .iter()
                    .filter_map(|p| p.age)
                    .collect::<HashSet<i32>>()
                    .into_iter()
                    .collect();
                ages.sort_unstable();
                ages.iter().map(|a| a.to_string()).collect()
            }
            Dimension::Gender | Dimension::Education => observed(profiles, dimension),
        }
    }
}

fn observed(profiles: &[DemographicProfile], dimension: Dimension) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::new();
    for s in profiles.iter().filter_map(|p| p.segment(dimension)) {
        if seen.insert(s.clone()) {
            res.push(s);
        }
    }
    res
}

/// Reads an integer, written either as such or as a float without fractional part
/// (spreadsheet exports turn `34` into `34.0`).
pub fn parse_whole_number(s: &str) -> Option<i32> {
    let t = s.trim();
    if let Ok(x) = t.parse::<i32>() {
        return Some(x);
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i32::MAX as f64 => Some(f as i32),
        _ => None,
    }
}
