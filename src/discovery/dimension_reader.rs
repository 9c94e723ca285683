//! Dimension readers
//!
//! Compute extra dimensions for every host of a cycle in one batch. The
//! result is read-only once computed and shared by all hosts of the cycle.
//!
//! The orchestrated reader derives each dimension from a process label with a
//! regex:
//!
//! ```yaml
//! spec:
//!   dimensions:
//!     kubernetes:
//!       paasta_service:
//!         paasta.yelp.com/service: "[a-z]*"
//!       paasta_instance:
//!         paasta.yelp.com/instance: ".*"
//! ```
//!
//! Here `paasta_service` takes the first match of `[a-z]*` in the value of
//! label `paasta.yelp.com/service`.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::orchestrator::ProcessSource;
use super::{Host, HostDimensions};
use crate::error::RuleError;
use crate::transformer::Dimensions;

/// Computes dimensions for a batch of hosts
#[async_trait]
pub trait DimensionReader: Send + Sync {
    /// Reader name, as used in configuration
    fn name(&self) -> &'static str;

    /// Dimensions keyed by host address; never fails
    async fn read(&self, hosts: &[Host]) -> HostDimensions;
}

/// Returns no dimensions
#[derive(Debug, Clone, Default)]
pub struct NoopDimensionReader;

#[async_trait]
impl DimensionReader for NoopDimensionReader {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn read(&self, _hosts: &[Host]) -> HostDimensions {
        HostDimensions::new()
    }
}

/// Source label and extraction pattern for one dimension
#[derive(Debug, Clone)]
pub struct LabelRegex {
    /// Label whose value is matched
    pub label: String,
    /// Extraction pattern
    pub regex: Regex,
}

impl LabelRegex {
    /// Compile a label/pattern pair
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            label: label.into(),
            regex,
        })
    }

    /// Extract the dimension value from a label value
    ///
    /// Uses the first match only: its first capture group when the pattern
    /// has one (empty if that group did not participate), the whole match
    /// otherwise. `--` becomes `_`.
    pub fn extract(&self, value: &str) -> Option<String> {
        let caps = self.regex.captures(value)?;
        let matched = if self.regex.captures_len() > 1 {
            caps.get(1).map_or("", |m| m.as_str())
        } else {
            caps.get(0).map_or("", |m| m.as_str())
        };
        Some(matched.replace("--", "_"))
    }
}

/// Derives dimensions from orchestrator process labels
pub struct OrchestratedDimensionReader {
    generators: BTreeMap<String, LabelRegex>,
    source: Arc<dyn ProcessSource>,
}

impl OrchestratedDimensionReader {
    /// Create a reader from compiled generators
    pub fn new(generators: BTreeMap<String, LabelRegex>, source: Arc<dyn ProcessSource>) -> Self {
        Self { generators, source }
    }

    /// Build generators from `dimension -> {label: pattern}`
    ///
    /// When a dimension lists several labels the last one wins. Invalid
    /// patterns are skipped.
    pub fn from_config(
        config: &BTreeMap<String, BTreeMap<String, String>>,
        source: Arc<dyn ProcessSource>,
    ) -> Self {
        let mut generators = BTreeMap::new();
        for (dimension, label_patterns) in config {
            for (label, pattern) in label_patterns {
                match LabelRegex::new(label, pattern) {
                    Ok(generator) => {
                        generators.insert(dimension.clone(), generator);
                    }
                    Err(e) => {
                        warn!(dimension = %dimension, error = %e, "Skipping dimension with invalid pattern");
                    }
                }
            }
        }
        Self::new(generators, source)
    }

    /// Dimensions generated from one process's labels
    pub fn generate(&self, labels: &BTreeMap<String, String>) -> Dimensions {
        self.generators
            .iter()
            .filter_map(|(dimension, generator)| {
                let value = labels.get(&generator.label)?;
                generator
                    .extract(value)
                    .map(|extracted| (dimension.clone(), extracted))
            })
            .collect()
    }
}

#[async_trait]
impl DimensionReader for OrchestratedDimensionReader {
    fn name(&self) -> &'static str {
        "orchestrated"
    }

    async fn read(&self, hosts: &[Host]) -> HostDimensions {
        let mut host_dimensions = HostDimensions::new();

        let processes = match self.source.list_processes().await {
            Ok(processes) => processes,
            Err(e) => {
                warn!(error = %e, "Failed to list processes; no dimensions this cycle");
                return host_dimensions;
            }
        };

        let wanted: HashSet<&str> = hosts.iter().map(|h| h.address.as_str()).collect();
        for process in processes {
            let Some(ip) = process.ip else { continue };
            if !wanted.contains(ip.as_str()) {
                continue;
            }
            let dimensions = self.generate(&process.labels);
            host_dimensions.insert(ip, dimensions);
        }

        host_dimensions
    }
}

/// Merges the output of several readers
///
/// Readers run in name order; on a key collision for the same host the later
/// reader wins.
#[derive(Default)]
pub struct CompositeDimensionReader {
    readers: Vec<Box<dyn DimensionReader>>,
}

impl CompositeDimensionReader {
    /// Create a composite over the given readers, in merge order
    pub fn new(readers: Vec<Box<dyn DimensionReader>>) -> Self {
        Self { readers }
    }

    /// Build readers from `reader name -> reader config`
    ///
    /// Unknown names and malformed reader configurations are skipped.
    pub fn from_config(
        config: &BTreeMap<String, serde_yaml::Value>,
        source: Arc<dyn ProcessSource>,
    ) -> Self {
        let mut readers: Vec<Box<dyn DimensionReader>> = Vec::new();

        for (name, reader_config) in config {
            match name.as_str() {
                "kubernetes" | "orchestrated" => {
                    match serde_yaml::from_value::<BTreeMap<String, BTreeMap<String, String>>>(
                        reader_config.clone(),
                    ) {
                        Ok(dims) => readers.push(Box::new(
                            OrchestratedDimensionReader::from_config(&dims, source.clone()),
                        )),
                        Err(e) => {
                            warn!(reader = %name, error = %e, "Skipping malformed dimension reader config");
                        }
                    }
                }
                "noop" => readers.push(Box::new(NoopDimensionReader)),
                other => {
                    debug!(reader = %other, "Skipping unknown dimension reader");
                }
            }
        }

        Self::new(readers)
    }

    /// Number of configured readers
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// Check if no readers are configured
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Deep-merge `other` into `into`, right-biased per host and key
    pub fn merge(into: &mut HostDimensions, other: HostDimensions) {
        for (host, dimensions) in other {
            into.entry(host).or_default().extend(dimensions);
        }
    }
}

#[async_trait]
impl DimensionReader for CompositeDimensionReader {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn read(&self, hosts: &[Host]) -> HostDimensions {
        let mut merged = HostDimensions::new();
        for reader in &self.readers {
            Self::merge(&mut merged, reader.read(hosts).await);
        }
        merged
    }
}
