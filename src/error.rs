//! Error types for rJMX-Collector
//!
//! This module defines the error types used throughout the application.
//! Errors raised inside a collection cycle never abort the cycle; callers log
//! them and continue with an empty result for the failed unit of work.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Regex compilation errors for rewrite rules and filter patterns
#[derive(Error, Debug)]
pub enum RuleError {
    /// Regex pattern failed to compile
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Collector error
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the bridge and orchestrator HTTP clients
#[derive(Error, Debug)]
pub enum CollectorError {
    /// HTTP client could not be built
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP response body could not be read
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// Malformed JSON body
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Bean identity without a `domain:keys` shape
    #[error("Invalid bean identity: {0}")]
    InvalidBeanIdentity(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollectorError::Timeout
        } else if err.is_connect() {
            CollectorError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            CollectorError::HttpRequest(err)
        } else {
            CollectorError::HttpResponse(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error",
                e.to_string(),
            ),
            AppError::Collector(e) => (StatusCode::BAD_GATEWAY, "Collector error", e.to_string()),
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", e),
        };

        tracing::error!(status = %status, error = %log_message, "Request failed");

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
