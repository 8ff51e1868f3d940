// ==============================================================================
// state.rs - Application State Management
// ==============================================================================
// Description: Shared, read-only cohort tables for the API gateway
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use cohort_stats::dataset::{Cohorts, DataPaths, DEFAULT_CROSS_SECTIONAL_FILE, DEFAULT_LONGITUDINAL_FILE};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Both cohorts, loaded once at startup
    cohorts: Cohorts,

    /// When the cohorts finished loading
    loaded_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state from environment
    ///
    /// Any missing or malformed dataset is fatal.
    pub async fn new() -> Result<Self> {
        let data_dir = PathBuf::from(std::env::var("COHORT_DATA_DIR").unwrap_or_else(|_| ".".to_string()));
        let cross_sectional =
            std::env::var("CROSS_SECTIONAL_FILE").unwrap_or_else(|_| DEFAULT_CROSS_SECTIONAL_FILE.to_string());
        let longitudinal =
            std::env::var("LONGITUDINAL_FILE").unwrap_or_else(|_| DEFAULT_LONGITUDINAL_FILE.to_string());

        let paths = DataPaths::resolve(&data_dir, cross_sectional, longitudinal);
        info!("Loading cohorts from {:?} and {:?}", paths.cross_sectional, paths.longitudinal);

        // CSV parsing is blocking work
        let cohorts = tokio::task::spawn_blocking(move || Cohorts::load(&paths))
            .await
            .context("Cohort loading task panicked")?
            .context("Failed to load cohort datasets")?;

        Ok(Self::from_cohorts(cohorts))
    }

    pub fn from_cohorts(cohorts: Cohorts) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cohorts,
                loaded_at: Utc::now(),
            }),
        }
    }

    /// Get loaded cohorts
    pub fn cohorts(&self) -> &Cohorts {
        &self.inner.cohorts
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.inner.loaded_at
    }

    /// Create mock state for testing
    #[cfg(test)]
    pub fn mock() -> Self {
        use cohort_stats::dataset::CohortTable;
        use cohort_stats::models::{ClinicalGroup, CohortKind, CohortRecord, Sex, VisitInfo};

        fn row(id: &str, sex: Sex, age: f64, cdr: f64, group: Option<ClinicalGroup>) -> CohortRecord {
            CohortRecord {
                subject_id: Some(id.to_string()),
                age: Some(age),
                sex: Some(sex),
                education_years: Some(10.0 + age / 10.0),
                ses: Some(2.0),
                cdr: Some(cdr),
                mmse: Some(30.0 - cdr * 4.0 - age / 40.0),
                etiv: Some(1400.0 + age),
                nwbv: Some(0.9 - age / 400.0),
                visit: group.map(|group| VisitInfo {
                    number: Some(1),
                    group: Some(group),
                }),
                condition: None,
                education_level: None,
            }
            .derive()
        }

        let cross_sectional = CohortTable::new(
            CohortKind::CrossSectional,
            vec![
                row("H1", Sex::Female, 70.0, 0.0, None),
                row("H2", Sex::Male, 72.0, 0.0, None),
                row("H3", Sex::Female, 74.0, 0.0, None),
                row("A1", Sex::Male, 80.0, 1.0, None),
                row("A2", Sex::Female, 82.0, 0.5, None),
                row("A3", Sex::Male, 84.0, 1.5, None),
            ],
        );
        let longitudinal = CohortTable::new(
            CohortKind::Longitudinal,
            vec![
                row("N1", Sex::Male, 75.0, 0.0, Some(ClinicalGroup::Nondemented)),
                row("N2", Sex::Female, 77.0, 0.0, Some(ClinicalGroup::Nondemented)),
                row("D1", Sex::Male, 79.0, 0.5, Some(ClinicalGroup::Demented)),
                row("D2", Sex::Female, 83.0, 1.0, Some(ClinicalGroup::Demented)),
                row("C1", Sex::Female, 85.0, 0.5, Some(ClinicalGroup::Converted)),
            ],
        );

        Self::from_cohorts(Cohorts::new(cross_sectional, longitudinal))
    }
}
