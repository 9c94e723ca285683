//! Host readers
//!
//! Produce the set of bridge hosts to scrape on the current cycle.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::orchestrator::{ProcessRecord, ProcessSource};
use super::Host;

/// Produces the hosts to scrape for one cycle
#[async_trait]
pub trait HostReader: Send + Sync {
    /// Reader name, as used in configuration
    fn name(&self) -> &'static str;

    /// Hosts to scrape this cycle; never fails
    async fn read(&self) -> Vec<Host>;
}

/// Host discovery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One fixed bridge address
    Standalone,
    /// Processes discovered through the orchestrator node agent
    Orchestrated,
}

impl Mode {
    /// Resolve a configured mode name, defaulting to standalone
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "standalone" => Mode::Standalone,
            "orchestrated" | "kubernetes" => Mode::Orchestrated,
            other => {
                warn!(mode = %other, "Unknown mode; defaulting to standalone");
                Mode::Standalone
            }
        }
    }
}

/// Build the host reader for `mode`
pub fn host_reader_for_mode(
    mode: Mode,
    host: &str,
    label_selector: &BTreeMap<String, String>,
    source: Arc<dyn ProcessSource>,
) -> Box<dyn HostReader> {
    match mode {
        Mode::Standalone => Box::new(StandaloneHostReader::new(host)),
        Mode::Orchestrated => Box::new(OrchestratedHostReader::new(
            label_selector.clone(),
            source,
        )),
    }
}

/// Always returns the single configured host
#[derive(Debug, Clone)]
pub struct StandaloneHostReader {
    host: Host,
}

impl StandaloneHostReader {
    /// Create a reader for `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            host: Host::new(address),
        }
    }
}

#[async_trait]
impl HostReader for StandaloneHostReader {
    fn name(&self) -> &'static str {
        "standalone"
    }

    async fn read(&self) -> Vec<Host> {
        vec![self.host.clone()]
    }
}

/// Selects orchestrator processes whose labels match every selector entry
///
/// An empty selector selects nothing, so a missing selector never scrapes
/// every process on the node.
pub struct OrchestratedHostReader {
    label_selector: BTreeMap<String, String>,
    source: Arc<dyn ProcessSource>,
}

impl OrchestratedHostReader {
    /// Create a reader with the given selector
    pub fn new(label_selector: BTreeMap<String, String>, source: Arc<dyn ProcessSource>) -> Self {
        Self {
            label_selector,
            source,
        }
    }

    /// Check a process against the selector
    ///
    /// A process without labels never matches.
    pub fn matches(&self, process: &ProcessRecord) -> bool {
        if process.labels.is_empty() {
            return false;
        }
        self.label_selector
            .iter()
            .all(|(key, value)| process.labels.get(key) == Some(value))
    }
}

#[async_trait]
impl HostReader for OrchestratedHostReader {
    fn name(&self) -> &'static str {
        "orchestrated"
    }

    async fn read(&self) -> Vec<Host> {
        if self.label_selector.is_empty() {
            debug!("Empty label selector; no hosts selected");
            return Vec::new();
        }

        let processes = match self.source.list_processes().await {
            Ok(processes) => processes,
            Err(e) => {
                warn!(error = %e, "Failed to list processes; no hosts this cycle");
                return Vec::new();
            }
        };

        processes
            .into_iter()
            .filter(|process| self.matches(process))
            .filter_map(|process| {
                process.ip.map(|address| Host {
                    address,
                    labels: process.labels,
                })
            })
            .collect()
    }
}
