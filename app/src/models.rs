// ==============================================================================
// models.rs - Cohort Data Models
// ==============================================================================
// Description: Records, derived labels and variables for the two OASIS cohorts
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two OASIS datasets a table holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortKind {
    /// One row per subject
    CrossSectional,
    /// One row per visit, several visits per subject
    Longitudinal,
}

impl CohortKind {
    pub const ALL: [CohortKind; 2] = [CohortKind::CrossSectional, CohortKind::Longitudinal];

    pub fn as_str(&self) -> &'static str {
        match self {
            CohortKind::CrossSectional => "cross_sectional",
            CohortKind::Longitudinal => "longitudinal",
        }
    }

    /// Title prefix used in report headings
    pub fn title(&self) -> &'static str {
        match self {
            CohortKind::CrossSectional => "Cross-Sectional",
            CohortKind::Longitudinal => "Longitudinal",
        }
    }

    pub fn group_pair(&self) -> GroupPair {
        match self {
            CohortKind::CrossSectional => GroupPair::CROSS_SECTIONAL,
            CohortKind::Longitudinal => GroupPair::LONGITUDINAL,
        }
    }
}

impl FromStr for CohortKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cross" | "cross_sectional" => Ok(CohortKind::CrossSectional),
            "long" | "longitudinal" => Ok(CohortKind::Longitudinal),
            other => Err(format!("unknown dataset '{}'", other)),
        }
    }
}

impl fmt::Display for CohortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Biological sex as recorded in the `M/F` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Female, Sex::Male];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Sex::Male),
            "f" | "female" => Ok(Sex::Female),
            other => Err(format!("unknown sex '{}'", other)),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group label recorded on longitudinal visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClinicalGroup {
    Nondemented,
    Demented,
    /// Nondemented at baseline, demented at a later visit
    Converted,
}

impl ClinicalGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalGroup::Nondemented => "Nondemented",
            ClinicalGroup::Demented => "Demented",
            ClinicalGroup::Converted => "Converted",
        }
    }

    /// Converted subjects belong to neither side of a two-group comparison.
    pub fn condition(&self) -> Option<Condition> {
        match self {
            ClinicalGroup::Nondemented => Some(Condition::Nondemented),
            ClinicalGroup::Demented => Some(Condition::Demented),
            ClinicalGroup::Converted => None,
        }
    }
}

impl FromStr for ClinicalGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nondemented" => Ok(ClinicalGroup::Nondemented),
            "demented" => Ok(ClinicalGroup::Demented),
            "converted" => Ok(ClinicalGroup::Converted),
            other => Err(format!("unknown group '{}'", other)),
        }
    }
}

/// Derived binary label used for every group comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Healthy,
    Alzheimer,
    Nondemented,
    Demented,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Healthy => "Healthy",
            Condition::Alzheimer => "Alzheimer",
            Condition::Nondemented => "Nondemented",
            Condition::Demented => "Demented",
        }
    }

    /// Cross-sectional rule: only a CDR of exactly zero is healthy.
    /// A missing rating is not zero, so it counts as affected.
    pub fn from_cdr(cdr: Option<f64>) -> Condition {
        match cdr {
            Some(rating) if rating == 0.0 => Condition::Healthy,
            _ => Condition::Alzheimer,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two Condition values a dataset is partitioned into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPair {
    /// Unaffected group (first operand of every comparison)
    pub reference: Condition,
    /// Affected group, numerator of the prevalence percentage
    pub affected: Condition,
}

impl GroupPair {
    pub const CROSS_SECTIONAL: GroupPair = GroupPair {
        reference: Condition::Healthy,
        affected: Condition::Alzheimer,
    };

    pub const LONGITUDINAL: GroupPair = GroupPair {
        reference: Condition::Nondemented,
        affected: Condition::Demented,
    };

    pub fn contains(&self, condition: Condition) -> bool {
        condition == self.reference || condition == self.affected
    }

    pub fn both(&self) -> [Condition; 2] {
        [self.reference, self.affected]
    }
}

/// Ordinal education level (1-5) bucketed from years of schooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EducationLevel(u8);

impl EducationLevel {
    pub const ALL: [EducationLevel; 5] = [
        EducationLevel(1),
        EducationLevel(2),
        EducationLevel(3),
        EducationLevel(4),
        EducationLevel(5),
    ];

    /// Breakpoints: <=8 -> 1, <=11 -> 2, <=13 -> 3, <=15 -> 4, else 5
    pub fn from_years(years: f64) -> EducationLevel {
        let level = if years <= 8.0 {
            1
        } else if years <= 11.0 {
            2
        } else if years <= 13.0 {
            3
        } else if years <= 15.0 {
            4
        } else {
            5
        };
        EducationLevel(level)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Visit metadata present only on longitudinal rows; either cell may be blank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisitInfo {
    pub number: Option<u32>,
    pub group: Option<ClinicalGroup>,
}

/// One row of either cohort, in the canonical schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRecord {
    pub subject_id: Option<String>,
    pub age: Option<f64>,
    pub sex: Option<Sex>,
    pub education_years: Option<f64>,
    pub ses: Option<f64>,
    pub cdr: Option<f64>,
    pub mmse: Option<f64>,
    pub etiv: Option<f64>,
    pub nwbv: Option<f64>,
    pub visit: Option<VisitInfo>,

    // Derived at load time
    pub condition: Option<Condition>,
    pub education_level: Option<EducationLevel>,
}

impl CohortRecord {
    /// Fill in `condition` and `education_level` from the raw fields.
    pub fn derive(mut self) -> Self {
        self.condition = match &self.visit {
            Some(visit) => visit.group.and_then(|group| group.condition()),
            None => Some(Condition::from_cdr(self.cdr)),
        };
        self.education_level = self.education_years.map(EducationLevel::from_years);
        self
    }
}

/// Numeric columns that take part in comparisons and correlations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Age,
    Education,
    Ses,
    Nwbv,
    Etiv,
    Mmse,
}

impl Variable {
    /// Variables compared in every descriptive summary
    pub const CORE: [Variable; 4] = [Variable::Age, Variable::Education, Variable::Ses, Variable::Nwbv];

    /// Core set plus intracranial volume and mental-state score
    pub const EXTENDED: [Variable; 6] = [
        Variable::Age,
        Variable::Education,
        Variable::Ses,
        Variable::Nwbv,
        Variable::Etiv,
        Variable::Mmse,
    ];

    pub fn value(&self, record: &CohortRecord) -> Option<f64> {
        match self {
            Variable::Age => record.age,
            Variable::Education => record.education_years,
            Variable::Ses => record.ses,
            Variable::Nwbv => record.nwbv,
            Variable::Etiv => record.etiv,
            Variable::Mmse => record.mmse,
        }
        .filter(|v| v.is_finite())
    }

    /// Human-readable label used in text reports and chart titles
    pub fn label(&self) -> &'static str {
        match self {
            Variable::Age => "Age",
            Variable::Education => "Education Level",
            Variable::Ses => "Socioeconomic Status",
            Variable::Nwbv => "Brain Volume (nWBV)",
            Variable::Etiv => "Intracranial Volume (eTIV)",
            Variable::Mmse => "Mental State (MMSE)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Age => "age",
            Variable::Education => "education",
            Variable::Ses => "ses",
            Variable::Nwbv => "nwbv",
            Variable::Etiv => "etiv",
            Variable::Mmse => "mmse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cdr: Option<f64>, visit: Option<VisitInfo>) -> CohortRecord {
        CohortRecord {
            subject_id: Some("OAS1_0001_MR1".to_string()),
            age: Some(74.0),
            sex: Some(Sex::Female),
            education_years: Some(12.0),
            ses: None,
            cdr,
            mmse: Some(29.0),
            etiv: Some(1344.0),
            nwbv: Some(0.743),
            visit,
            condition: None,
            education_level: None,
        }
        .derive()
    }

    #[test]
    fn test_education_level_breakpoints() {
        assert_eq!(EducationLevel::from_years(8.0).value(), 1);
        assert_eq!(EducationLevel::from_years(9.0).value(), 2);
        assert_eq!(EducationLevel::from_years(11.0).value(), 2);
        assert_eq!(EducationLevel::from_years(12.0).value(), 3);
        assert_eq!(EducationLevel::from_years(13.0).value(), 3);
        assert_eq!(EducationLevel::from_years(15.0).value(), 4);
        assert_eq!(EducationLevel::from_years(16.0).value(), 5);
        assert_eq!(EducationLevel::from_years(0.0).value(), 1);
    }

    #[test]
    fn test_education_level_monotonic() {
        let mut previous = EducationLevel::from_years(0.0);
        for years in 0..=30 {
            let level = EducationLevel::from_years(years as f64);
            assert!(level >= previous, "level decreased at {} years", years);
            previous = level;
        }
    }

    #[test]
    fn test_condition_from_cdr() {
        assert_eq!(record(Some(0.0), None).condition, Some(Condition::Healthy));
        assert_eq!(record(Some(0.5), None).condition, Some(Condition::Alzheimer));
        assert_eq!(record(Some(1.5), None).condition, Some(Condition::Alzheimer));
        // Missing rating is not zero
        assert_eq!(record(None, None).condition, Some(Condition::Alzheimer));
        assert_eq!(Condition::from_cdr(None), Condition::Alzheimer);
    }

    #[test]
    fn test_condition_from_longitudinal_group() {
        let visit = |group| {
            Some(VisitInfo {
                number: Some(1),
                group: Some(group),
            })
        };

        // Group label wins over CDR on longitudinal rows
        assert_eq!(
            record(Some(0.5), visit(ClinicalGroup::Nondemented)).condition,
            Some(Condition::Nondemented)
        );
        assert_eq!(
            record(Some(1.0), visit(ClinicalGroup::Demented)).condition,
            Some(Condition::Demented)
        );
        assert_eq!(record(Some(0.5), visit(ClinicalGroup::Converted)).condition, None);

        // Blank group label on a longitudinal row
        let blank = Some(VisitInfo {
            number: Some(2),
            group: None,
        });
        assert_eq!(record(Some(0.0), blank).condition, None);
    }

    #[test]
    fn test_derive_sets_education_level() {
        let r = record(Some(0.0), None);
        assert_eq!(r.education_level, Some(EducationLevel::from_years(12.0)));
    }

    #[test]
    fn test_sex_parse() {
        assert_eq!("M".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!(" f ".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("Female".parse::<Sex>().unwrap(), Sex::Female);
        assert!("X".parse::<Sex>().is_err());
    }

    #[test]
    fn test_variable_value_filters_non_finite() {
        let mut r = record(Some(0.0), None);
        r.nwbv = Some(f64::NAN);
        assert_eq!(Variable::Nwbv.value(&r), None);
        assert_eq!(Variable::Age.value(&r), Some(74.0));
        assert_eq!(Variable::Ses.value(&r), None);

        r.age = None;
        assert_eq!(Variable::Age.value(&r), None);
    }

    #[test]
    fn test_group_pair_contains() {
        let pair = GroupPair::CROSS_SECTIONAL;
        assert!(pair.contains(Condition::Healthy));
        assert!(pair.contains(Condition::Alzheimer));
        assert!(!pair.contains(Condition::Demented));
    }

    #[test]
    fn test_cohort_kind_parse() {
        assert_eq!("cross".parse::<CohortKind>().unwrap(), CohortKind::CrossSectional);
        assert_eq!("cross-sectional".parse::<CohortKind>().unwrap(), CohortKind::CrossSectional);
        assert_eq!("Longitudinal".parse::<CohortKind>().unwrap(), CohortKind::Longitudinal);
        assert!("both".parse::<CohortKind>().is_err());
        assert_eq!(CohortKind::Longitudinal.group_pair(), GroupPair::LONGITUDINAL);
    }

    #[test]
    fn test_condition_serde() {
        let json = serde_json::to_string(&Condition::Alzheimer).unwrap();
        assert_eq!(json, "\"Alzheimer\"");
        let sex = serde_json::to_string(&Sex::Male).unwrap();
        assert_eq!(sex, "\"M\"");
    }
}
