// ==============================================================================
// dataset.rs - In-Memory Cohort Tables
// ==============================================================================
// Description: Immutable cohort tables loaded once at startup and shared by
//              reference with every analysis
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::models::{CohortKind, CohortRecord, Condition, GroupPair, Variable};
use crate::parsers::CohortParser;
use crate::validator::{FileValidator, ValidatedFile};

pub const DEFAULT_CROSS_SECTIONAL_FILE: &str = "oasis_cross-sectional-processed.csv";
pub const DEFAULT_LONGITUDINAL_FILE: &str = "oasis_longitudinal-processed.csv";

/// Locations of the two cohort files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub cross_sectional: PathBuf,
    pub longitudinal: PathBuf,
}

impl DataPaths {
    /// Default file names inside `data_dir`
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            cross_sectional: dir.join(DEFAULT_CROSS_SECTIONAL_FILE),
            longitudinal: dir.join(DEFAULT_LONGITUDINAL_FILE),
        }
    }

    /// Resolve explicit file names; relative names are taken from `data_dir`
    pub fn resolve(data_dir: impl AsRef<Path>, cross_sectional: impl AsRef<Path>, longitudinal: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            cross_sectional: dir.join(cross_sectional),
            longitudinal: dir.join(longitudinal),
        }
    }

    pub fn path(&self, kind: CohortKind) -> &Path {
        match kind {
            CohortKind::CrossSectional => &self.cross_sectional,
            CohortKind::Longitudinal => &self.longitudinal,
        }
    }
}

/// Row counts per Condition, for logging and report headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub total_rows: usize,
    pub reference_rows: usize,
    pub affected_rows: usize,
    /// Rows excluded from comparisons (Converted, unclassifiable CDR)
    pub excluded_rows: usize,
}

/// One cohort, read-only after construction
#[derive(Debug, Clone)]
pub struct CohortTable {
    kind: CohortKind,
    groups: GroupPair,
    records: Vec<CohortRecord>,
    provenance: Option<ValidatedFile>,
}

impl CohortTable {
    pub fn new(kind: CohortKind, records: Vec<CohortRecord>) -> Self {
        Self {
            kind,
            groups: kind.group_pair(),
            records,
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: ValidatedFile) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Validate and parse one cohort file
    pub fn load(kind: CohortKind, path: &Path, validator: &FileValidator) -> Result<Self> {
        let validated = validator
            .validate(path)
            .with_context(|| format!("Validation failed for {} dataset", kind))?;

        let records = CohortParser::new(kind)
            .parse(path)
            .with_context(|| format!("Failed to parse {} dataset {:?}", kind, path))?;

        let table = Self::new(kind, records).with_provenance(validated);
        let counts = table.counts();
        info!(
            "Loaded {} dataset: {} rows ({} {}, {} {}, {} excluded)",
            kind,
            counts.total_rows,
            counts.reference_rows,
            table.groups.reference,
            counts.affected_rows,
            table.groups.affected,
            counts.excluded_rows
        );

        Ok(table)
    }

    pub fn kind(&self) -> CohortKind {
        self.kind
    }

    pub fn groups(&self) -> GroupPair {
        self.groups
    }

    pub fn records(&self) -> &[CohortRecord] {
        &self.records
    }

    pub fn provenance(&self) -> Option<&ValidatedFile> {
        self.provenance.as_ref()
    }

    /// Rows whose Condition belongs to `groups`
    pub fn comparable_rows(&self, groups: GroupPair) -> Vec<&CohortRecord> {
        self.records
            .iter()
            .filter(|r| r.condition.map(|c| groups.contains(c)).unwrap_or(false))
            .collect()
    }

    /// Rows with exactly this Condition
    pub fn rows_in(&self, condition: Condition) -> impl Iterator<Item = &CohortRecord> {
        self.records.iter().filter(move |r| r.condition == Some(condition))
    }

    /// Non-missing values of `variable` within one Condition group
    pub fn values(&self, variable: Variable, condition: Condition) -> Vec<f64> {
        self.rows_in(condition).filter_map(|r| variable.value(r)).collect()
    }

    pub fn counts(&self) -> TableCounts {
        let reference_rows = self.rows_in(self.groups.reference).count();
        let affected_rows = self.rows_in(self.groups.affected).count();
        TableCounts {
            total_rows: self.records.len(),
            reference_rows,
            affected_rows,
            excluded_rows: self.records.len() - reference_rows - affected_rows,
        }
    }
}

/// Both cohorts, loaded once and shared immutably
#[derive(Debug, Clone)]
pub struct Cohorts {
    pub cross_sectional: Arc<CohortTable>,
    pub longitudinal: Arc<CohortTable>,
}

impl Cohorts {
    /// Load both datasets; any failure is fatal to the caller.
    pub fn load(paths: &DataPaths) -> Result<Self> {
        let validator = FileValidator::new();

        let cross_sectional = CohortTable::load(CohortKind::CrossSectional, &paths.cross_sectional, &validator)?;
        let longitudinal = CohortTable::load(CohortKind::Longitudinal, &paths.longitudinal, &validator)?;

        Ok(Self::new(cross_sectional, longitudinal))
    }

    pub fn new(cross_sectional: CohortTable, longitudinal: CohortTable) -> Self {
        Self {
            cross_sectional: Arc::new(cross_sectional),
            longitudinal: Arc::new(longitudinal),
        }
    }

    pub fn table(&self, kind: CohortKind) -> &CohortTable {
        match kind {
            CohortKind::CrossSectional => &self.cross_sectional,
            CohortKind::Longitudinal => &self.longitudinal,
        }
    }
}

/// Small in-memory fixtures shared by unit tests across modules
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::{ClinicalGroup, Sex, VisitInfo};

    pub fn record(id: &str, sex: Sex, age: f64, cdr: Option<f64>) -> CohortRecord {
        CohortRecord {
            subject_id: Some(id.to_string()),
            age: Some(age),
            sex: Some(sex),
            education_years: Some(12.0),
            ses: Some(2.0),
            cdr,
            mmse: Some(28.0),
            etiv: Some(1400.0),
            nwbv: Some(0.72),
            visit: None,
            condition: None,
            education_level: None,
        }
        .derive()
    }

    pub fn visit(id: &str, sex: Sex, age: f64, group: ClinicalGroup) -> CohortRecord {
        let mut r = record(id, sex, age, Some(0.0));
        r.visit = Some(VisitInfo {
            number: Some(1),
            group: Some(group),
        });
        r.derive()
    }

    /// Three healthy (ages 70, 72, 74) and three affected (80, 82, 84) subjects
    pub fn age_scenario() -> CohortTable {
        CohortTable::new(
            CohortKind::CrossSectional,
            vec![
                record("H1", Sex::Female, 70.0, Some(0.0)),
                record("H2", Sex::Male, 72.0, Some(0.0)),
                record("H3", Sex::Female, 74.0, Some(0.0)),
                record("A1", Sex::Male, 80.0, Some(1.0)),
                record("A2", Sex::Female, 82.0, Some(0.5)),
                record("A3", Sex::Male, 84.0, Some(1.5)),
            ],
        )
    }
}
