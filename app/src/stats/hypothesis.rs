// ==============================================================================
// stats/hypothesis.rs - Parametric Hypothesis Tests
// ==============================================================================
// Description: Two-sample t-test, chi-square independence test, one-way ANOVA
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};

use super::descriptive::{mean, sample_variance};
use super::{clamp_probability, NotAvailable};

/// Result of a two-sided, pooled-variance two-sample t-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
}

/// Student's two-sample t-test assuming equal variances
///
/// # Returns
/// * `Err(InsufficientObservations)` - either sample has fewer than 2 values
/// * `Err(ZeroVariance)` - both samples are constant (standard error of 0)
pub fn student_t_test(a: &[f64], b: &[f64]) -> Result<TTest, NotAvailable> {
    if a.len() < 2 || b.len() < 2 {
        return Err(NotAvailable::InsufficientObservations);
    }

    let na = a.len() as f64;
    let nb = b.len() as f64;
    let ma = mean(a).ok_or(NotAvailable::InsufficientObservations)?;
    let mb = mean(b).ok_or(NotAvailable::InsufficientObservations)?;
    let va = sample_variance(a).ok_or(NotAvailable::InsufficientObservations)?;
    let vb = sample_variance(b).ok_or(NotAvailable::InsufficientObservations)?;

    let df = na + nb - 2.0;
    let pooled = ((na - 1.0) * va + (nb - 1.0) * vb) / df;
    let se = (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    if se == 0.0 || !se.is_finite() {
        return Err(NotAvailable::ZeroVariance);
    }

    let t = (ma - mb) / se;
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|_| NotAvailable::InsufficientObservations)?;
    let p = clamp_probability(2.0 * dist.sf(t.abs()));

    Ok(TTest {
        t_statistic: t,
        degrees_of_freedom: df,
        p_value: p,
    })
}

/// Result of a chi-square test of independence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    /// Yates' continuity correction applied (single degree of freedom)
    pub yates_corrected: bool,
}

/// Chi-square test of independence over an r x c table of counts
///
/// With one degree of freedom each |observed - expected| is shrunk toward
/// zero by at most 0.5 (Yates' correction).
///
/// # Returns
/// * `Err(EmptyMargin)` - any row or column sums to zero
/// * `Err(InsufficientObservations)` - fewer than two rows or columns
pub fn chi_square_independence(observed: &[Vec<u64>]) -> Result<ChiSquareTest, NotAvailable> {
    let rows = observed.len();
    let cols = observed.first().map(|r| r.len()).unwrap_or(0);
    if rows == 0 || cols == 0 || observed.iter().any(|r| r.len() != cols) {
        return Err(NotAvailable::EmptyMargin);
    }

    let row_totals: Vec<f64> = observed.iter().map(|r| r.iter().sum::<u64>() as f64).collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|j| observed.iter().map(|r| r[j]).sum::<u64>() as f64)
        .collect();

    if row_totals.iter().chain(col_totals.iter()).any(|&t| t == 0.0) {
        return Err(NotAvailable::EmptyMargin);
    }
    if rows < 2 || cols < 2 {
        return Err(NotAvailable::InsufficientObservations);
    }

    let total: f64 = row_totals.iter().sum();
    let dof = (rows - 1) * (cols - 1);
    let yates = dof == 1;

    let mut statistic = 0.0;
    for (i, row) in observed.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / total;
            let mut diff = (count as f64 - expected).abs();
            if yates {
                diff -= diff.min(0.5);
            }
            statistic += diff * diff / expected;
        }
    }

    let dist = ChiSquared::new(dof as f64).map_err(|_| NotAvailable::InsufficientObservations)?;
    let p = clamp_probability(dist.sf(statistic));

    Ok(ChiSquareTest {
        statistic,
        degrees_of_freedom: dof,
        p_value: p,
        yates_corrected: yates,
    })
}

/// Result of a one-way analysis of variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaTest {
    pub f_statistic: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub p_value: f64,
    /// Number of non-empty groups that entered the test
    pub groups: usize,
}

/// One-way ANOVA across the non-empty groups
///
/// # Returns
/// * `Err(SingleGroup)` - fewer than two non-empty groups
/// * `Err(InsufficientObservations)` - no within-group degrees of freedom
/// * `Err(ZeroVariance)` - every group is internally constant
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<AnovaTest, NotAvailable> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    if k < 2 {
        return Err(NotAvailable::SingleGroup);
    }

    let n: usize = groups.iter().map(|g| g.len()).sum();
    if n <= k {
        return Err(NotAvailable::InsufficientObservations);
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let group_mean = mean(group).ok_or(NotAvailable::InsufficientObservations)?;
        ss_between += group.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();
    }

    if ss_within == 0.0 {
        return Err(NotAvailable::ZeroVariance);
    }

    let df_between = k - 1;
    let df_within = n - k;
    let f = (ss_between / df_between as f64) / (ss_within / df_within as f64);

    let dist = FisherSnedecor::new(df_between as f64, df_within as f64)
        .map_err(|_| NotAvailable::InsufficientObservations)?;
    let p = clamp_probability(dist.sf(f));

    Ok(AnovaTest {
        f_statistic: f,
        df_between,
        df_within,
        p_value: p,
        groups: k,
    })
}
