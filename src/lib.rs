//! rJMX-Collector library
//!
//! This crate provides the core functionality for discovering JMX bridge
//! hosts, walking the beans they expose and publishing numeric attributes as
//! metrics with per-technology naming.
//!
//! A collection cycle runs: host reader → dimension reader → per host
//! listing, filtering, reads and attribute walk → formatter → published
//! batches.

pub mod cli;
pub mod collector;
pub mod config;
pub mod discovery;
pub mod error;
pub mod formatter;
pub mod metrics;
pub mod server;
pub mod transformer;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// `RUST_LOG` takes precedence over `level` when set. Logs go to stderr so
/// `--once` output stays parseable.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
