// ==============================================================================
// main.rs - Cohort API Gateway Entry Point
// ==============================================================================
// Description: Axum web server exposing cohort statistics as JSON
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod handlers;
mod models;
mod state;

use state::AppState;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 7860;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing (LOG_FORMAT=json for structured output)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cohort_api_gateway=info,cohort_stats=info,tower_http=info".into());
    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    info!("Starting Cohort API Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load both cohorts; the server never starts without them
    let state = AppState::new()
        .await
        .context("Failed to initialize application state")?;

    let app = build_router(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match std::env::var("PORT") {
        Ok(port) => port
            .parse::<u16>()
            .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("API Gateway listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/analysis/{category}", get(handlers::run_analysis))
        .route("/datasets/{dataset}/summary", get(handlers::dataset_summary));

    // Origins are configured via CORS_ALLOWED_ORIGINS env var (comma-separated)
    let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    let allowed_origins: Vec<_> = cors_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_credentials(false)
        // Read-only API
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api/cohorts", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = build_router(AppState::mock())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "Cohort Statistics API");

        let (status, body) = get_json("/api/cohorts/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_reports_datasets() {
        let (status, body) = get_json("/api/cohorts/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["datasets"][0]["dataset"], "cross_sectional");
        assert_eq!(body["datasets"][0]["rows"], 6);
        // Converted visit is not comparable
        assert_eq!(body["datasets"][1]["comparable_rows"], 4);
    }

    #[tokio::test]
    async fn test_descriptive_analysis() {
        let (status, body) = get_json("/api/cohorts/analysis/descriptive").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "descriptive");

        let age = &body["datasets"][0]["summary"]["comparisons"][0];
        assert_eq!(age["variable"], "age");
        assert_eq!(age["reference"]["mean"], 72.0);
        assert_eq!(age["affected"]["mean"], 82.0);
        let p = age["p_value"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[tokio::test]
    async fn test_extended_analysis_query() {
        let (status, body) = get_json("/api/cohorts/analysis/descriptive?extended=true&bins=4").await;
        assert_eq!(status, StatusCode::OK);
        let comparisons = body["datasets"][0]["summary"]["comparisons"].as_array().unwrap();
        assert_eq!(comparisons.len(), 6);
        assert!(body["datasets"][0]["summary"]["regression"].is_object());
    }

    #[tokio::test]
    async fn test_predictive_placeholder() {
        let (status, body) = get_json("/api/cohorts/analysis/predictive").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Predictive Analysis (Coming Soon)");
    }

    #[tokio::test]
    async fn test_unknown_category_is_bad_request() {
        let (status, body) = get_json("/api/cohorts/analysis/clustering").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("clustering"));

        let (status, _) = get_json("/api/cohorts/analysis/descriptive?bins=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dataset_summary() {
        let (status, body) = get_json("/api/cohorts/datasets/longitudinal/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dataset"], "longitudinal");
        assert_eq!(body["reference_rows"], 2);
        assert_eq!(body["affected_rows"], 2);
        assert_eq!(body["excluded_rows"], 1);

        let (status, _) = get_json("/api/cohorts/datasets/cross-sectional/summary").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json("/api/cohorts/datasets/unknown/summary").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown dataset: unknown");
    }
}
