// ==============================================================================
// summarizer.rs - Cohort Statistics Summarizer
// ==============================================================================
// Description: Pure two-group summary of a cohort table: per-variable t-tests,
//              sex x condition chi-square, prevalence by sex, OLS of MMSE on
//              education
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use serde::Serialize;
use tracing::debug;

use crate::dataset::CohortTable;
use crate::models::{CohortKind, Condition, GroupPair, Sex, Variable};
use crate::stats::{self, LinearFit, NotAvailable};

/// Which optional parts of the summary to compute
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOptions {
    /// Variables given a two-sample comparison, in report order
    pub variables: Vec<Variable>,
    /// Fit MMSE on years of education
    pub include_regression: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            variables: Variable::CORE.to_vec(),
            include_regression: false,
        }
    }
}

impl SummaryOptions {
    /// Core variables plus eTIV and MMSE
    pub fn extended() -> Self {
        Self {
            variables: Variable::EXTENDED.to_vec(),
            include_regression: false,
        }
    }

    pub fn with_regression(mut self) -> Self {
        self.include_regression = true;
        self
    }
}

/// Count, mean and spread of one group on one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub condition: Condition,
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl GroupStats {
    fn from_values(condition: Condition, values: &[f64]) -> Self {
        Self {
            condition,
            count: values.len(),
            mean: stats::mean(values),
            std_dev: stats::sample_std_dev(values),
        }
    }
}

/// Two-sample comparison of one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableComparison {
    pub variable: Variable,
    pub label: &'static str,
    pub reference: GroupStats,
    pub affected: GroupStats,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_available: Option<NotAvailable>,
}

/// Counts of one sex across the two Conditions (reference, affected)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyRow {
    pub sex: Sex,
    pub counts: [u64; 2],
}

/// Chi-square association between sex and Condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SexAssociation {
    pub table: Vec<ContingencyRow>,
    pub statistic: Option<f64>,
    pub degrees_of_freedom: Option<usize>,
    pub p_value: Option<f64>,
    pub yates_corrected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_available: Option<NotAvailable>,
}

/// Share of one sex carrying the affected Condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SexPrevalence {
    pub sex: Sex,
    pub total: usize,
    pub affected: usize,
    /// affected / total x 100
    pub percent_affected: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_available: Option<NotAvailable>,
}

/// OLS fit of a response on a predictor over the comparable rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionSummary {
    pub response: Variable,
    pub predictor: Variable,
    pub fit: Option<LinearFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_available: Option<NotAvailable>,
}

/// Everything the summarizer produces for one table and group pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    pub dataset: CohortKind,
    pub groups: GroupPair,
    pub reference_rows: usize,
    pub affected_rows: usize,
    /// Rows outside both groups
    pub excluded_rows: usize,
    pub comparisons: Vec<VariableComparison>,
    pub sex_association: SexAssociation,
    pub prevalence: Vec<SexPrevalence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionSummary>,
}

impl CohortSummary {
    pub fn comparison(&self, variable: Variable) -> Option<&VariableComparison> {
        self.comparisons.iter().find(|c| c.variable == variable)
    }

    pub fn prevalence_for(&self, sex: Sex) -> Option<&SexPrevalence> {
        self.prevalence.iter().find(|p| p.sex == sex)
    }
}

fn split<T>(result: Result<T, NotAvailable>) -> (Option<T>, Option<NotAvailable>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(reason) => (None, Some(reason)),
    }
}

/// Stateless summarizer; holds only its options
#[derive(Debug, Clone, Default)]
pub struct CohortSummarizer {
    options: SummaryOptions,
}

impl CohortSummarizer {
    pub fn new(options: SummaryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SummaryOptions {
        &self.options
    }

    /// Summarize `table` split into the two Conditions of `groups`
    ///
    /// Rows outside the pair are ignored. When only one of the two groups has
    /// rows, every two-group statistic is reported as `single_group`.
    pub fn summarize(&self, table: &CohortTable, groups: GroupPair) -> CohortSummary {
        let reference_rows = table.rows_in(groups.reference).count();
        let affected_rows = table.rows_in(groups.affected).count();
        let single_group = is_single_group(table, groups);

        if single_group {
            debug!(
                "{} dataset has a single condition group ({}: {}, {}: {})",
                table.kind(),
                groups.reference,
                reference_rows,
                groups.affected,
                affected_rows
            );
        }

        let comparisons = self
            .options
            .variables
            .iter()
            .map(|&variable| compare_variable(table, groups, variable, single_group))
            .collect();

        let regression = self
            .options
            .include_regression
            .then(|| education_regression(table, groups));

        CohortSummary {
            dataset: table.kind(),
            groups,
            reference_rows,
            affected_rows,
            excluded_rows: table.records().len().saturating_sub(reference_rows + affected_rows),
            comparisons,
            sex_association: sex_association(table, groups, single_group),
            prevalence: prevalence_by_sex(table, groups),
            regression,
        }
    }
}

/// True when the two groups cannot be compared: a degenerate pair or an empty side
pub fn is_single_group(table: &CohortTable, groups: GroupPair) -> bool {
    groups.reference == groups.affected
        || table.rows_in(groups.reference).next().is_none()
        || table.rows_in(groups.affected).next().is_none()
}

/// Pairwise-complete two-sample comparison of one variable
pub fn compare_variable(table: &CohortTable, groups: GroupPair, variable: Variable, single_group: bool) -> VariableComparison {
    let reference_values = table.values(variable, groups.reference);
    let affected_values = table.values(variable, groups.affected);

    let result = if single_group {
        Err(NotAvailable::SingleGroup)
    } else {
        stats::student_t_test(&reference_values, &affected_values)
    };
    let (test, not_available) = split(result);

    if let Some(reason) = not_available {
        debug!("{} comparison on {}: not available ({})", table.kind(), variable.as_str(), reason);
    }

    VariableComparison {
        variable,
        label: variable.label(),
        reference: GroupStats::from_values(groups.reference, &reference_values),
        affected: GroupStats::from_values(groups.affected, &affected_values),
        t_statistic: test.as_ref().map(|t| t.t_statistic),
        p_value: test.as_ref().map(|t| t.p_value),
        not_available,
    }
}

/// Sex x Condition contingency table and its chi-square test
pub fn sex_association(table: &CohortTable, groups: GroupPair, single_group: bool) -> SexAssociation {
    let rows: Vec<ContingencyRow> = Sex::ALL
        .iter()
        .map(|&sex| {
            let count = |condition: Condition| table.rows_in(condition).filter(|r| r.sex == Some(sex)).count() as u64;
            ContingencyRow {
                sex,
                counts: [count(groups.reference), count(groups.affected)],
            }
        })
        .collect();

    let result = if single_group {
        Err(NotAvailable::SingleGroup)
    } else {
        let observed: Vec<Vec<u64>> = rows.iter().map(|r| r.counts.to_vec()).collect();
        stats::chi_square_independence(&observed)
    };
    let (test, not_available) = split(result);

    SexAssociation {
        table: rows,
        statistic: test.as_ref().map(|t| t.statistic),
        degrees_of_freedom: test.as_ref().map(|t| t.degrees_of_freedom),
        p_value: test.as_ref().map(|t| t.p_value),
        yates_corrected: test.as_ref().map(|t| t.yates_corrected).unwrap_or(false),
        not_available,
    }
}

/// Affected percentage for each sex over the rows of both groups
pub fn prevalence_by_sex(table: &CohortTable, groups: GroupPair) -> Vec<SexPrevalence> {
    let comparable = table.comparable_rows(groups);

    Sex::ALL
        .iter()
        .map(|&sex| {
            let total = comparable.iter().filter(|r| r.sex == Some(sex)).count();
            let affected = comparable
                .iter()
                .filter(|r| r.sex == Some(sex) && r.condition == Some(groups.affected))
                .count();

            let (percent_affected, not_available) = if total == 0 {
                (None, Some(NotAvailable::EmptyGroup))
            } else {
                (Some(affected as f64 / total as f64 * 100.0), None)
            };

            SexPrevalence {
                sex,
                total,
                affected,
                percent_affected,
                not_available,
            }
        })
        .collect()
}

/// MMSE regressed on years of education across both groups
pub fn education_regression(table: &CohortTable, groups: GroupPair) -> RegressionSummary {
    let comparable = table.comparable_rows(groups);
    let (education, mmse) = stats::regression::paired_values(&comparable, Variable::Education, Variable::Mmse);
    let (fit, not_available) = split(stats::linear_regression(&education, &mmse));

    RegressionSummary {
        response: Variable::Mmse,
        predictor: Variable::Education,
        fit,
        not_available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{age_scenario, record, visit};
    use crate::dataset::CohortTable;
    use crate::models::ClinicalGroup;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_age_scenario_means_and_p_value() {
        let table = age_scenario();
        let summary = CohortSummarizer::default().summarize(&table, GroupPair::CROSS_SECTIONAL);

        let age = summary.comparison(Variable::Age).unwrap();
        assert_eq!(age.reference.mean, Some(72.0));
        assert_eq!(age.affected.mean, Some(82.0));
        assert_eq!(age.reference.count, 3);
        assert_eq!(age.affected.count, 3);

        let p = age.p_value.unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!(p < 0.01);
        assert!(age.not_available.is_none());
    }

    #[test]
    fn test_all_healthy_is_not_available() {
        let table = CohortTable::new(
            CohortKind::CrossSectional,
            vec![
                record("H1", Sex::Female, 70.0, Some(0.0)),
                record("H2", Sex::Male, 72.0, Some(0.0)),
                record("H3", Sex::Female, 74.0, Some(0.0)),
            ],
        );
        let summary = CohortSummarizer::new(SummaryOptions::extended()).summarize(&table, GroupPair::CROSS_SECTIONAL);

        assert_eq!(summary.affected_rows, 0);
        assert_eq!(summary.comparisons.len(), Variable::EXTENDED.len());
        for comparison in &summary.comparisons {
            assert_eq!(comparison.p_value, None);
            assert_eq!(comparison.not_available, Some(NotAvailable::SingleGroup));
        }
        assert_eq!(summary.sex_association.p_value, None);
        assert_eq!(summary.sex_association.not_available, Some(NotAvailable::SingleGroup));

        // Prevalence is still defined: nobody is affected
        assert_eq!(summary.prevalence_for(Sex::Female).unwrap().percent_affected, Some(0.0));
    }

    #[test]
    fn test_pairwise_missing_exclusion() {
        let mut rows = age_scenario().records().to_vec();
        rows[0].ses = None;
        rows[1].ses = None;
        let table = CohortTable::new(CohortKind::CrossSectional, rows);

        let summary = CohortSummarizer::default().summarize(&table, GroupPair::CROSS_SECTIONAL);

        // SES loses two healthy rows and drops below the minimum
        let ses = summary.comparison(Variable::Ses).unwrap();
        assert_eq!(ses.reference.count, 1);
        assert_eq!(ses.not_available, Some(NotAvailable::InsufficientObservations));
        assert_eq!(ses.p_value, None);

        // Age is unaffected by the missing SES values
        let age = summary.comparison(Variable::Age).unwrap();
        assert_eq!(age.reference.count, 3);
        assert!(age.p_value.is_some());
    }

    #[test]
    fn test_constant_variable_is_not_available() {
        // Every fixture row shares the same education years
        let summary = CohortSummarizer::default().summarize(&age_scenario(), GroupPair::CROSS_SECTIONAL);
        let educ = summary.comparison(Variable::Education).unwrap();
        assert_eq!(educ.not_available, Some(NotAvailable::ZeroVariance));
        assert_eq!(educ.reference.mean, Some(12.0));
    }

    #[test]
    fn test_sex_association_table() {
        let summary = CohortSummarizer::default().summarize(&age_scenario(), GroupPair::CROSS_SECTIONAL);
        let association = &summary.sex_association;

        let female = association.table.iter().find(|r| r.sex == Sex::Female).unwrap();
        let male = association.table.iter().find(|r| r.sex == Sex::Male).unwrap();
        assert_eq!(female.counts, [2, 1]);
        assert_eq!(male.counts, [1, 2]);

        assert_eq!(association.degrees_of_freedom, Some(1));
        assert!(association.yates_corrected);
        let p = association.p_value.unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_sex_association_missing_sex() {
        let table = CohortTable::new(
            CohortKind::CrossSectional,
            vec![
                record("H1", Sex::Female, 70.0, Some(0.0)),
                record("H2", Sex::Female, 72.0, Some(0.0)),
                record("A1", Sex::Female, 80.0, Some(1.0)),
            ],
        );
        let summary = CohortSummarizer::default().summarize(&table, GroupPair::CROSS_SECTIONAL);

        assert_eq!(summary.sex_association.not_available, Some(NotAvailable::EmptyMargin));
        let male = summary.prevalence_for(Sex::Male).unwrap();
        assert_eq!(male.total, 0);
        assert_eq!(male.percent_affected, None);
        assert_eq!(male.not_available, Some(NotAvailable::EmptyGroup));
    }

    #[test]
    fn test_blank_age_and_sex_are_not_available() {
        let mut rows = age_scenario().records().to_vec();
        for (i, row) in rows.iter_mut().enumerate() {
            row.ses = Some(1.0 + (i % 3) as f64);
        }
        rows[0].age = None;
        rows[3].sex = None;
        let table = CohortTable::new(CohortKind::CrossSectional, rows);

        let summary = CohortSummarizer::default().summarize(&table, GroupPair::CROSS_SECTIONAL);
        assert_eq!(summary.reference_rows, 3);
        assert_eq!(summary.affected_rows, 3);

        let age = summary.comparison(Variable::Age).unwrap();
        assert_eq!(age.reference.count, 2);
        assert_eq!(age.reference.mean, Some(73.0));
        assert_eq!(age.affected.count, 3);

        // The blank age row still counts toward SES
        let ses = summary.comparison(Variable::Ses).unwrap();
        assert_eq!(ses.reference.count, 3);
        assert_eq!(ses.affected.count, 3);
        assert!(ses.p_value.is_some());

        // The row without sex is left out of the contingency table and prevalence
        let female = summary.sex_association.table.iter().find(|r| r.sex == Sex::Female).unwrap();
        let male = summary.sex_association.table.iter().find(|r| r.sex == Sex::Male).unwrap();
        assert_eq!(female.counts, [2, 1]);
        assert_eq!(male.counts, [1, 1]);
        assert!(summary.sex_association.statistic.is_some());

        let male_prevalence = summary.prevalence_for(Sex::Male).unwrap();
        assert_eq!(male_prevalence.total, 2);
        assert_eq!(male_prevalence.affected, 1);
        assert_eq!(male_prevalence.percent_affected, Some(50.0));
        assert_eq!(summary.prevalence_for(Sex::Female).unwrap().total, 3);
    }

    #[test]
    fn test_prevalence_round_trip() {
        let summary = CohortSummarizer::default().summarize(&age_scenario(), GroupPair::CROSS_SECTIONAL);

        for prevalence in &summary.prevalence {
            let percent = prevalence.percent_affected.unwrap();
            let recovered = percent * prevalence.total as f64 / 100.0;
            assert_abs_diff_eq!(recovered, prevalence.affected as f64, epsilon = 1e-9);
            assert_eq!(recovered.round() as usize, prevalence.affected);
        }

        let female = summary.prevalence_for(Sex::Female).unwrap();
        assert_eq!(female.total, 3);
        assert_eq!(female.affected, 1);
    }

    #[test]
    fn test_longitudinal_excludes_converted() {
        let table = CohortTable::new(
            CohortKind::Longitudinal,
            vec![
                visit("N1", Sex::Male, 70.0, ClinicalGroup::Nondemented),
                visit("N2", Sex::Female, 71.0, ClinicalGroup::Nondemented),
                visit("D1", Sex::Male, 80.0, ClinicalGroup::Demented),
                visit("D2", Sex::Female, 82.0, ClinicalGroup::Demented),
                visit("C1", Sex::Female, 99.0, ClinicalGroup::Converted),
            ],
        );
        let summary = CohortSummarizer::default().summarize(&table, GroupPair::LONGITUDINAL);

        assert_eq!(summary.reference_rows, 2);
        assert_eq!(summary.affected_rows, 2);
        assert_eq!(summary.excluded_rows, 1);

        let age = summary.comparison(Variable::Age).unwrap();
        assert_eq!(age.reference.mean, Some(70.5));
        assert_eq!(age.affected.mean, Some(81.0));

        let female = summary.prevalence_for(Sex::Female).unwrap();
        assert_eq!(female.total, 2);
        assert_eq!(female.percent_affected, Some(50.0));
    }

    #[test]
    fn test_wrong_group_pair_is_single_group() {
        // Cross-sectional rows carry no Nondemented/Demented labels
        let summary = CohortSummarizer::default().summarize(&age_scenario(), GroupPair::LONGITUDINAL);
        assert_eq!(summary.reference_rows, 0);
        assert!(summary
            .comparisons
            .iter()
            .all(|c| c.not_available == Some(NotAvailable::SingleGroup)));
    }

    #[test]
    fn test_education_regression() {
        let mut rows = age_scenario().records().to_vec();
        for (i, row) in rows.iter_mut().enumerate() {
            row.education_years = Some(8.0 + 2.0 * i as f64);
            row.mmse = Some(20.0 + i as f64 + if i % 2 == 0 { 0.5 } else { 0.0 });
        }
        let table = CohortTable::new(CohortKind::CrossSectional, rows);

        let summary = CohortSummarizer::new(SummaryOptions::default().with_regression())
            .summarize(&table, GroupPair::CROSS_SECTIONAL);

        let regression = summary.regression.unwrap();
        assert_eq!(regression.response, Variable::Mmse);
        let fit = regression.fit.unwrap();
        assert!(fit.slope > 0.0);
        assert_eq!(fit.n, 6);
        assert!((0.0..=1.0).contains(&fit.p_value));
    }

    #[test]
    fn test_summary_serializes_nulls() {
        let table = CohortTable::new(
            CohortKind::CrossSectional,
            vec![record("H1", Sex::Female, 70.0, Some(0.0))],
        );
        let summary = CohortSummarizer::default().summarize(&table, GroupPair::CROSS_SECTIONAL);
        let json = serde_json::to_value(&summary).unwrap();

        assert!(json["comparisons"][0]["p_value"].is_null());
        assert_eq!(json["comparisons"][0]["not_available"], "single_group");
        assert_eq!(json["dataset"], "cross_sectional");
    }
}
