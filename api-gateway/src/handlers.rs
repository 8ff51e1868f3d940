// ==============================================================================
// handlers.rs - API Request Handlers
// ==============================================================================
// Description: HTTP request handlers for cohort statistics endpoints
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use cohort_stats::analysis::{self, AnalysisCategory, AnalysisCategoryError, AnalysisOptions, AnalysisReport};
use cohort_stats::models::CohortKind;
use cohort_stats::summarizer::{CohortSummarizer, CohortSummary, SummaryOptions};

use crate::{models::*, state::AppState};

/// Upper bound on requested histogram bins
const MAX_HISTOGRAM_BINS: usize = 200;

/// Root endpoint - API information
pub async fn root() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "Cohort Statistics API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "/api/cohorts/health - Health check",
            "/api/cohorts/ready - Readiness check",
            "/api/cohorts/analysis/{category} - descriptive, education, correlation or predictive (GET)",
            "/api/cohorts/datasets/{dataset}/summary - cross_sectional or longitudinal (GET)",
        ],
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let datasets: Vec<DatasetStatus> = CohortKind::ALL
        .iter()
        .map(|&kind| {
            let table = state.cohorts().table(kind);
            DatasetStatus {
                dataset: kind.as_str(),
                rows: table.records().len(),
                comparable_rows: table.comparable_rows(table.groups()).len(),
                sha256: table.provenance().map(|p| p.hash_sha256.clone()),
            }
        })
        .collect();

    let ready = datasets.iter().all(|d| d.rows > 0);

    let response = ReadinessResponse {
        ready,
        loaded_at: state.loaded_at(),
        datasets,
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

fn analysis_options(query: &AnalysisQuery) -> Result<AnalysisOptions, AppError> {
    let mut options = AnalysisOptions::default();

    if query.extended.unwrap_or(false) {
        options.summary = SummaryOptions::extended().with_regression();
    }
    if let Some(bins) = query.bins {
        if bins == 0 || bins > MAX_HISTOGRAM_BINS {
            return Err(AppError::BadRequest(format!(
                "bins must be between 1 and {}",
                MAX_HISTOGRAM_BINS
            )));
        }
        options.histogram_bins = bins;
    }

    Ok(options)
}

/// Run one analysis category over both cohorts
pub async fn run_analysis(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisReport>, AppError> {
    let category: AnalysisCategory = category.parse()?;
    let options = analysis_options(&query)?;
    info!("Analysis request: {}", category);

    // Statistics are CPU-bound; keep them off the async workers
    let report = tokio::task::spawn_blocking(move || analysis::run_analysis(state.cohorts(), category, &options))
        .await
        .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))?;

    Ok(Json(report))
}

/// Summarize one dataset with its own group pair
pub async fn dataset_summary(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<CohortSummary>, AppError> {
    let kind: CohortKind = dataset.parse().map_err(|_| {
        warn!("Summary requested for unknown dataset '{}'", dataset);
        AppError::NotFound(format!("Unknown dataset: {}", dataset))
    })?;
    let options = analysis_options(&query)?;

    let summary = tokio::task::spawn_blocking(move || {
        let table = state.cohorts().table(kind);
        CohortSummarizer::new(options.summary).summarize(table, table.groups())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Summary task failed: {}", e)))?;

    Ok(Json(summary))
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<AnalysisCategoryError> for AppError {
    fn from(err: AnalysisCategoryError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", "See server logs"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
