//! HTTP server module
//!
//! Provides the Axum-based HTTP server exposing published metrics.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::collector::Collector;
use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::CollectorMetrics;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Cycle driver; one cycle runs at a time
    pub collector: Arc<Mutex<Collector>>,
    /// Internal metrics registry
    pub metrics: Arc<CollectorMetrics>,
}

impl AppState {
    /// Validate the configuration and build the collector
    pub fn from_config(config: Config) -> AppResult<Self> {
        config.validate()?;

        let metrics = Arc::new(CollectorMetrics::new());
        let collector = Collector::from_config(&config, metrics.clone())?;

        Ok(Self {
            config: Arc::new(config),
            collector: Arc::new(Mutex::new(collector)),
            metrics,
        })
    }
}

/// Build the router for `state`
pub fn app(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse the configured bind address
///
/// Accepts an IP address or `localhost`.
pub fn bind_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    let ip: std::net::IpAddr = if bind_address == "localhost" {
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
    } else {
        bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.", bind_address, e))?
    };
    Ok(SocketAddr::from((ip, port)))
}

/// Run the HTTP server
///
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to
/// start
pub async fn run(config: Config) -> Result<()> {
    let addr = bind_addr(&config.server.bind_address, config.server.port)?;
    let metrics_path = config.server.path.clone();

    let state = AppState::from_config(config)?;
    let app = app(state);

    info!(address = %addr, metrics_path = %metrics_path, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
