//! Host and dimension discovery
//!
//! Decides which bridge hosts to scrape on each cycle and which extra
//! dimensions to attach to each host's metrics.
//!
//! - [`HostReader`]: standalone (one fixed address) or orchestrated (processes
//!   reported by the node agent, filtered by a label selector)
//! - [`DimensionReader`]: noop, orchestrated (regex extraction from process
//!   labels) or composite (merge of configured readers)
//! - [`ProcessSource`]: the node agent client both orchestrated readers use

mod dimension_reader;
mod host_reader;
mod orchestrator;

pub use dimension_reader::{
    CompositeDimensionReader, DimensionReader, LabelRegex, NoopDimensionReader,
    OrchestratedDimensionReader,
};
pub use host_reader::{
    host_reader_for_mode, HostReader, Mode, OrchestratedHostReader, StandaloneHostReader,
};
pub use orchestrator::{KubeletClient, ProcessRecord, ProcessSource};

use std::collections::{BTreeMap, HashMap};

use crate::transformer::Dimensions;

/// Dimensions per host address
pub type HostDimensions = HashMap<String, Dimensions>;

/// A scrape target, recomputed every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// IP address or hostname of the bridge
    pub address: String,
    /// Labels reported for the process; empty in standalone mode
    pub labels: BTreeMap<String, String>,
}

impl Host {
    /// Create a host without labels
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}
