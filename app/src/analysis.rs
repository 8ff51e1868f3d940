// ==============================================================================
// analysis.rs - Analysis Categories
// ==============================================================================
// Description: Maps an analysis selector to a report over both cohorts, with
//              chart-ready aggregates (histograms, box plots, prevalence bars)
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::dataset::{CohortTable, Cohorts};
use crate::models::{CohortKind, Condition, EducationLevel, GroupPair, Sex, Variable};
use crate::stats::{self, AnovaTest, CorrelationMatrix, DistributionSummary, HistogramBin, NotAvailable};
use crate::summarizer::{self, CohortSummarizer, CohortSummary, RegressionSummary, SummaryOptions, VariableComparison};

pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// Message returned for the predictive category
pub const PREDICTIVE_PLACEHOLDER: &str = "Predictive Analysis (Coming Soon)";

/// Variables entering the correlation matrix, in display order
pub const CORRELATION_VARIABLES: [Variable; 6] = [
    Variable::Age,
    Variable::Education,
    Variable::Ses,
    Variable::Mmse,
    Variable::Etiv,
    Variable::Nwbv,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisCategoryError {
    #[error("Unknown analysis category: '{0}' (expected descriptive, education, correlation or predictive)")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisCategory {
    Descriptive,
    Education,
    Correlation,
    Predictive,
}

impl AnalysisCategory {
    pub const ALL: [AnalysisCategory; 4] = [
        AnalysisCategory::Descriptive,
        AnalysisCategory::Education,
        AnalysisCategory::Correlation,
        AnalysisCategory::Predictive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisCategory::Descriptive => "descriptive",
            AnalysisCategory::Education => "education",
            AnalysisCategory::Correlation => "correlation",
            AnalysisCategory::Predictive => "predictive",
        }
    }

    pub fn is_implemented(&self) -> bool {
        !matches!(self, AnalysisCategory::Predictive)
    }
}

impl FromStr for AnalysisCategory {
    type Err = AnalysisCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "descriptive" => Ok(AnalysisCategory::Descriptive),
            "education" => Ok(AnalysisCategory::Education),
            "correlation" => Ok(AnalysisCategory::Correlation),
            "predictive" => Ok(AnalysisCategory::Predictive),
            _ => Err(AnalysisCategoryError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub summary: SummaryOptions,
    pub histogram_bins: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            summary: SummaryOptions::default(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

// ------------------------------------------------------------------------------
// Report types
// ------------------------------------------------------------------------------

/// Histogram and box-plot summary of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub condition: Condition,
    pub histogram: Vec<HistogramBin>,
    pub box_plot: Option<DistributionSummary>,
}

/// Distribution chart of one variable, one series per Condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableChart {
    pub variable: Variable,
    pub title: String,
    pub groups: Vec<GroupDistribution>,
}

/// One bar of the grouped prevalence chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrevalenceBar {
    pub sex: Sex,
    pub condition: Condition,
    pub count: usize,
    /// Share of this sex's comparable rows; the two bars of a sex sum to 100
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveReport {
    pub dataset: CohortKind,
    pub title: &'static str,
    pub summary: CohortSummary,
    pub charts: Vec<VariableChart>,
    pub prevalence_title: String,
    pub prevalence_bars: Vec<PrevalenceBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCount {
    pub level: EducationLevel,
    pub condition: Condition,
    pub count: usize,
}

/// MMSE within one education level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelGroup {
    pub level: EducationLevel,
    pub count: usize,
    pub mean_mmse: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelAnova {
    pub groups: Vec<LevelGroup>,
    pub test: Option<AnovaTest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_available: Option<NotAvailable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationReport {
    pub dataset: CohortKind,
    pub title: &'static str,
    pub level_distribution: Vec<LevelCount>,
    pub education_comparison: VariableComparison,
    pub mmse_by_level: LevelAnova,
    pub regression: RegressionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub dataset: CohortKind,
    pub title: &'static str,
    pub observations: usize,
    pub matrix: CorrelationMatrix,
}

/// Result of one analysis category over both cohorts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum AnalysisReport {
    Descriptive { datasets: Vec<DescriptiveReport> },
    Education { datasets: Vec<EducationReport> },
    Correlation { datasets: Vec<CorrelationReport> },
    Predictive { message: String },
}

impl AnalysisReport {
    pub fn category(&self) -> AnalysisCategory {
        match self {
            AnalysisReport::Descriptive { .. } => AnalysisCategory::Descriptive,
            AnalysisReport::Education { .. } => AnalysisCategory::Education,
            AnalysisReport::Correlation { .. } => AnalysisCategory::Correlation,
            AnalysisReport::Predictive { .. } => AnalysisCategory::Predictive,
        }
    }
}

// ------------------------------------------------------------------------------
// Runners
// ------------------------------------------------------------------------------

/// Run one analysis category over both cohorts
pub fn run_analysis(cohorts: &Cohorts, category: AnalysisCategory, options: &AnalysisOptions) -> AnalysisReport {
    info!("Running {} analysis", category);

    match category {
        AnalysisCategory::Descriptive => AnalysisReport::Descriptive {
            datasets: CohortKind::ALL
                .iter()
                .map(|&kind| describe_dataset(cohorts.table(kind), options))
                .collect(),
        },
        AnalysisCategory::Education => AnalysisReport::Education {
            datasets: CohortKind::ALL
                .iter()
                .map(|&kind| education_report(cohorts.table(kind)))
                .collect(),
        },
        AnalysisCategory::Correlation => AnalysisReport::Correlation {
            datasets: CohortKind::ALL
                .iter()
                .map(|&kind| correlation_report(cohorts.table(kind)))
                .collect(),
        },
        AnalysisCategory::Predictive => AnalysisReport::Predictive {
            message: PREDICTIVE_PLACEHOLDER.to_string(),
        },
    }
}

/// Summary plus chart aggregates for one dataset
pub fn describe_dataset(table: &CohortTable, options: &AnalysisOptions) -> DescriptiveReport {
    let groups = table.groups();
    let summary = CohortSummarizer::new(options.summary.clone()).summarize(table, groups);

    let charts = options
        .summary
        .variables
        .iter()
        .map(|&variable| variable_chart(table, groups, variable, options.histogram_bins))
        .collect();

    DescriptiveReport {
        dataset: table.kind(),
        title: table.kind().title(),
        summary,
        charts,
        prevalence_title: format!("{} - Alzheimer Prevalence by Gender", table.kind().title()),
        prevalence_bars: prevalence_bars(table, groups),
    }
}

fn variable_chart(table: &CohortTable, groups: GroupPair, variable: Variable, bins: usize) -> VariableChart {
    let groups = groups
        .both()
        .iter()
        .map(|&condition| {
            let values = table.values(variable, condition);
            GroupDistribution {
                condition,
                histogram: stats::histogram(&values, bins),
                box_plot: DistributionSummary::from_values(&values),
            }
        })
        .collect();

    VariableChart {
        variable,
        title: format!("{} - {} Distribution", table.kind().title(), variable.label()),
        groups,
    }
}

/// Per-sex percentage of each Condition over the comparable rows
pub fn prevalence_bars(table: &CohortTable, groups: GroupPair) -> Vec<PrevalenceBar> {
    let comparable = table.comparable_rows(groups);
    let mut bars = Vec::with_capacity(Sex::ALL.len() * 2);

    for sex in Sex::ALL {
        let total = comparable.iter().filter(|r| r.sex == Some(sex)).count();
        for condition in groups.both() {
            let count = comparable
                .iter()
                .filter(|r| r.sex == Some(sex) && r.condition == Some(condition))
                .count();
            let percent = (total > 0).then(|| count as f64 / total as f64 * 100.0);
            bars.push(PrevalenceBar {
                sex,
                condition,
                count,
                percent,
            });
        }
    }

    bars
}

/// Education-focused report for one dataset
pub fn education_report(table: &CohortTable) -> EducationReport {
    let groups = table.groups();
    let comparable = table.comparable_rows(groups);

    let mut level_distribution = Vec::with_capacity(EducationLevel::ALL.len() * 2);
    for level in EducationLevel::ALL {
        for condition in groups.both() {
            let count = comparable
                .iter()
                .filter(|r| r.education_level == Some(level) && r.condition == Some(condition))
                .count();
            level_distribution.push(LevelCount { level, condition, count });
        }
    }

    let mmse_groups: Vec<Vec<f64>> = EducationLevel::ALL
        .iter()
        .map(|&level| {
            comparable
                .iter()
                .filter(|r| r.education_level == Some(level))
                .filter_map(|r| Variable::Mmse.value(r))
                .collect()
        })
        .collect();

    let level_groups = EducationLevel::ALL
        .iter()
        .zip(&mmse_groups)
        .map(|(&level, values)| LevelGroup {
            level,
            count: values.len(),
            mean_mmse: stats::mean(values),
        })
        .collect();

    let (test, not_available) = match stats::one_way_anova(&mmse_groups) {
        Ok(test) => (Some(test), None),
        Err(reason) => {
            debug!("{} MMSE by education level: not available ({})", table.kind(), reason);
            (None, Some(reason))
        }
    };

    let single_group = summarizer::is_single_group(table, groups);

    EducationReport {
        dataset: table.kind(),
        title: table.kind().title(),
        level_distribution,
        education_comparison: summarizer::compare_variable(table, groups, Variable::Education, single_group),
        mmse_by_level: LevelAnova {
            groups: level_groups,
            test,
            not_available,
        },
        regression: summarizer::education_regression(table, groups),
    }
}

/// Pearson matrix over the comparable rows of one dataset
pub fn correlation_report(table: &CohortTable) -> CorrelationReport {
    let comparable = table.comparable_rows(table.groups());

    CorrelationReport {
        dataset: table.kind(),
        title: table.kind().title(),
        observations: comparable.len(),
        matrix: stats::correlation_matrix(&comparable, &CORRELATION_VARIABLES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{age_scenario, visit};
    use crate::models::ClinicalGroup;
    use approx::assert_abs_diff_eq;

    fn cohorts() -> Cohorts {
        let longitudinal = CohortTable::new(
            CohortKind::Longitudinal,
            vec![
                visit("N1", Sex::Male, 70.0, ClinicalGroup::Nondemented),
                visit("N2", Sex::Female, 71.0, ClinicalGroup::Nondemented),
                visit("N3", Sex::Female, 73.0, ClinicalGroup::Nondemented),
                visit("D1", Sex::Male, 80.0, ClinicalGroup::Demented),
                visit("D2", Sex::Female, 82.0, ClinicalGroup::Demented),
                visit("C1", Sex::Female, 90.0, ClinicalGroup::Converted),
            ],
        );
        Cohorts::new(age_scenario(), longitudinal)
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("descriptive".parse::<AnalysisCategory>().unwrap(), AnalysisCategory::Descriptive);
        assert_eq!(" Correlation ".parse::<AnalysisCategory>().unwrap(), AnalysisCategory::Correlation);
        for category in AnalysisCategory::ALL {
            assert_eq!(category.as_str().parse::<AnalysisCategory>().unwrap(), category);
        }

        let err = "clustering".parse::<AnalysisCategory>().unwrap_err();
        assert_eq!(err, AnalysisCategoryError::Unknown("clustering".to_string()));
        assert!(err.to_string().contains("clustering"));
    }

    #[test]
    fn test_predictive_is_placeholder() {
        let report = run_analysis(&cohorts(), AnalysisCategory::Predictive, &AnalysisOptions::default());
        assert_eq!(report.category(), AnalysisCategory::Predictive);
        match report {
            AnalysisReport::Predictive { message } => assert_eq!(message, PREDICTIVE_PLACEHOLDER),
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_descriptive_covers_both_datasets() {
        let report = run_analysis(&cohorts(), AnalysisCategory::Descriptive, &AnalysisOptions::default());
        let AnalysisReport::Descriptive { datasets } = report else {
            panic!("expected descriptive report");
        };

        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].dataset, CohortKind::CrossSectional);
        assert_eq!(datasets[1].dataset, CohortKind::Longitudinal);
        assert_eq!(datasets[1].summary.excluded_rows, 1);

        let age_chart = &datasets[0].charts[0];
        assert_eq!(age_chart.title, "Cross-Sectional - Age Distribution");
        for group in &age_chart.groups {
            let binned: usize = group.histogram.iter().map(|b| b.count).sum();
            assert_eq!(binned, 3);
            assert_eq!(group.box_plot.as_ref().unwrap().count, 3);
        }
        assert_eq!(age_chart.groups[0].box_plot.as_ref().unwrap().median, 72.0);
    }

    #[test]
    fn test_prevalence_bars_sum_to_hundred() {
        let table = age_scenario();
        let bars = prevalence_bars(&table, table.groups());
        assert_eq!(bars.len(), 4);

        for sex in Sex::ALL {
            let total: f64 = bars.iter().filter(|b| b.sex == sex).filter_map(|b| b.percent).sum();
            assert_abs_diff_eq!(total, 100.0, epsilon = 1e-9);
        }

        let female_alz = bars
            .iter()
            .find(|b| b.sex == Sex::Female && b.condition == Condition::Alzheimer)
            .unwrap();
        assert_eq!(female_alz.count, 1);
        assert_abs_diff_eq!(female_alz.percent.unwrap(), 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_education_report() {
        let mut rows = age_scenario().records().to_vec();
        let years = [8.0, 8.0, 12.0, 12.0, 18.0, 18.0];
        let mmse = [24.0, 26.0, 27.0, 29.0, 29.0, 30.0];
        for ((row, y), m) in rows.iter_mut().zip(years).zip(mmse) {
            row.education_years = Some(y);
            row.mmse = Some(m);
            row.education_level = Some(EducationLevel::from_years(y));
        }
        let table = CohortTable::new(CohortKind::CrossSectional, rows);

        let report = education_report(&table);

        let level1: usize = report
            .level_distribution
            .iter()
            .filter(|c| c.level == EducationLevel::from_years(8.0))
            .map(|c| c.count)
            .sum();
        assert_eq!(level1, 2);

        let anova = report.mmse_by_level.test.as_ref().unwrap();
        assert_eq!(anova.groups, 3);
        assert_eq!(anova.df_between, 2);
        assert_eq!(anova.df_within, 3);
        assert!((0.0..=1.0).contains(&anova.p_value));

        assert!(report.regression.fit.as_ref().unwrap().slope > 0.0);
        assert!(report.education_comparison.p_value.is_some());
    }

    #[test]
    fn test_correlation_report() {
        let report = correlation_report(&age_scenario());
        assert_eq!(report.observations, 6);
        assert_eq!(report.matrix.variables, CORRELATION_VARIABLES.to_vec());
        assert_abs_diff_eq!(report.matrix.get(Variable::Age, Variable::Age).unwrap(), 1.0, epsilon = 1e-12);
        // Education is constant in the fixture
        assert_eq!(report.matrix.get(Variable::Age, Variable::Education), None);
    }

    #[test]
    fn test_report_json_is_tagged() {
        let report = run_analysis(&cohorts(), AnalysisCategory::Correlation, &AnalysisOptions::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["category"], "correlation");
        assert_eq!(json["datasets"][1]["dataset"], "longitudinal");
    }
}
