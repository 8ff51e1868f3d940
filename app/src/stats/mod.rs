// ==============================================================================
// stats/mod.rs - Statistics kernels
// ==============================================================================
// Description: Descriptive statistics, hypothesis tests and regression
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-15
// Version: 1.0.0
// ==============================================================================

pub mod descriptive;
pub mod hypothesis;
pub mod regression;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use descriptive::{histogram, mean, quantile, sample_std_dev, sample_variance, DistributionSummary, HistogramBin};
pub use hypothesis::{chi_square_independence, one_way_anova, student_t_test, AnovaTest, ChiSquareTest, TTest};
pub use regression::{correlation_matrix, linear_regression, pearson, CorrelationMatrix, LinearFit};

/// Reason a statistic could not be computed
///
/// Every kernel returns `Result<T, NotAvailable>` instead of NaN so callers
/// can embed the reason in the report next to a null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotAvailable {
    /// A group holds fewer observations than the test needs
    InsufficientObservations,
    /// Observations are constant, so the statistic is undefined
    ZeroVariance,
    /// A contingency table has an empty row or column
    EmptyMargin,
    /// Only one of the two Condition values is present
    SingleGroup,
    /// A denominator count is zero
    EmptyGroup,
}

impl NotAvailable {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotAvailable::InsufficientObservations => "insufficient_observations",
            NotAvailable::ZeroVariance => "zero_variance",
            NotAvailable::EmptyMargin => "empty_margin",
            NotAvailable::SingleGroup => "single_group",
            NotAvailable::EmptyGroup => "empty_group",
        }
    }
}

impl fmt::Display for NotAvailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a tail probability into [0, 1]; distribution tails can drift by an ulp.
pub(crate) fn clamp_probability(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}
