// ==============================================================================
// stats/regression.rs - Regression and Correlation
// ==============================================================================
// Description: Single-predictor OLS fit and pairwise Pearson correlation matrix
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::{clamp_probability, NotAvailable};
use crate::models::{CohortRecord, Variable};

/// Ordinary least squares fit of `y = intercept + slope * x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    pub slope_std_err: f64,
    /// `None` for a perfect fit, where the statistic is unbounded
    pub t_statistic: Option<f64>,
    /// Two-sided p-value for slope != 0
    pub p_value: f64,
}

struct Moments {
    n: f64,
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

fn moments(x: &[f64], y: &[f64]) -> Moments {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    Moments { n, mean_x, mean_y, sxx, syy, sxy }
}

/// Fit `y` on `x`; both slices must be aligned observation pairs
///
/// # Returns
/// * `Err(InsufficientObservations)` - fewer than 3 pairs or mismatched lengths
/// * `Err(ZeroVariance)` - `x` or `y` is constant
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LinearFit, NotAvailable> {
    if x.len() != y.len() || x.len() < 3 {
        return Err(NotAvailable::InsufficientObservations);
    }

    let m = moments(x, y);
    if m.sxx == 0.0 || m.syy == 0.0 {
        return Err(NotAvailable::ZeroVariance);
    }

    let slope = m.sxy / m.sxx;
    let intercept = m.mean_y - slope * m.mean_x;
    let r = (m.sxy / (m.sxx * m.syy).sqrt()).clamp(-1.0, 1.0);

    let df = m.n - 2.0;
    let rss = (m.syy - slope * m.sxy).max(0.0);
    let slope_std_err = (rss / df / m.sxx).sqrt();

    let (t_statistic, p_value) = if slope_std_err == 0.0 {
        (None, 0.0)
    } else {
        let t = slope / slope_std_err;
        let dist = StudentsT::new(0.0, 1.0, df).map_err(|_| NotAvailable::InsufficientObservations)?;
        (Some(t), clamp_probability(2.0 * dist.sf(t.abs())))
    };

    Ok(LinearFit {
        n: x.len(),
        slope,
        intercept,
        r,
        r_squared: r * r,
        slope_std_err,
        t_statistic,
        p_value,
    })
}

/// Pearson correlation coefficient of aligned pairs
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64, NotAvailable> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(NotAvailable::InsufficientObservations);
    }
    let m = moments(x, y);
    if m.sxx == 0.0 || m.syy == 0.0 {
        return Err(NotAvailable::ZeroVariance);
    }
    Ok((m.sxy / (m.sxx * m.syy).sqrt()).clamp(-1.0, 1.0))
}

/// Values of two variables over the rows where both are present
pub fn paired_values(records: &[&CohortRecord], x: Variable, y: Variable) -> (Vec<f64>, Vec<f64>) {
    records
        .iter()
        .filter_map(|r| Some((x.value(r)?, y.value(r)?)))
        .unzip()
}

/// Symmetric Pearson matrix over pairwise-complete observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<Variable>,
    /// Row-major coefficients; `None` where a pair cannot be correlated
    pub coefficients: Vec<Vec<Option<f64>>>,
    /// Number of complete pairs behind each coefficient
    pub observations: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Variable, b: Variable) -> Option<f64> {
        let i = self.variables.iter().position(|v| *v == a)?;
        let j = self.variables.iter().position(|v| *v == b)?;
        self.coefficients[i][j]
    }
}

pub fn correlation_matrix(records: &[&CohortRecord], variables: &[Variable]) -> CorrelationMatrix {
    let k = variables.len();
    let mut coefficients = vec![vec![None; k]; k];
    let mut observations = vec![vec![0usize; k]; k];

    for i in 0..k {
        for j in i..k {
            let (x, y) = paired_values(records, variables[i], variables[j]);
            let r = pearson(&x, &y).ok();
            coefficients[i][j] = r;
            coefficients[j][i] = r;
            observations[i][j] = x.len();
            observations[j][i] = x.len();
        }
    }

    CorrelationMatrix {
        variables: variables.to_vec(),
        coefficients,
        observations,
    }
}
