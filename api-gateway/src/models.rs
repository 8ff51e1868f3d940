// ==============================================================================
// models.rs - API Data Models
// ==============================================================================
// Description: Request/response models for the cohort statistics API
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional knobs on analysis and summary requests
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    /// Also compare eTIV and MMSE and fit MMSE on education
    pub extended: Option<bool>,
    /// Histogram bins per variable and group
    pub bins: Option<usize>,
}

/// API information response
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Row counts of one loaded dataset
#[derive(Debug, Serialize)]
pub struct DatasetStatus {
    pub dataset: &'static str,
    pub rows: usize,
    pub comparable_rows: usize,
    pub sha256: Option<String>,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub loaded_at: DateTime<Utc>,
    pub datasets: Vec<DatasetStatus>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
