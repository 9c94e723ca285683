//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{self, header, StatusCode},
    response::{Html, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::transformer::{PrometheusExposition, PrometheusSample};

/// Prometheus text exposition content type
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>rJMX-Collector</title>
</head>
<body>
    <h1>rJMX-Collector</h1>
    <p>Version: {}</p>
    <p>Mode: {} / Formatter: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.mode,
        state.config.formatter.kind,
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint - runs one collection cycle and returns Prometheus format
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> AppResult<Response> {
    let start = Instant::now();

    let batches = state.collector.lock().await.collect().await;

    let mut samples = PrometheusExposition::samples_from_batches(&batches);
    let published = samples.len();
    samples.extend(state.metrics.to_samples());
    samples.push(
        PrometheusSample::new("rjmx_collector_info", 1.0)
            .with_help("rJMX-Collector information")
            .with_label("version", env!("CARGO_PKG_VERSION")),
    );
    samples.push(
        PrometheusSample::new("rjmx_collector_cycle_duration_seconds", start.elapsed().as_secs_f64())
            .with_help("Time spent in the last collection cycle"),
    );

    let output = PrometheusExposition::new().format(&samples);

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        hosts = batches.len(),
        metrics_count = published,
        "Metrics collection complete"
    );

    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .body(Body::from(output))
        .map_err(|e| AppError::Internal(e.to_string()))
}
