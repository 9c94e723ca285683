//! Configuration management for rJMX-Collector
//!
//! Handles loading and validating configuration from YAML files.
//!
//! # Example
//!
//! ```yaml
//! bridge:
//!   port: 8778
//!   url_path: jolokia
//! mode: orchestrated
//! spec:
//!   label_selector:
//!     paasta.yelp.com/service: kafka
//!   dimensions:
//!     kubernetes:
//!       paasta_instance:
//!         paasta.yelp.com/instance: ".*"
//! mbean_blacklist:
//!   - "kafka.log:name=Size"
//! rewrite:
//!   - pattern: "-v\\d+\\.\\d+\\.\\d+"
//!     replacement: "-AllVersions"
//! formatter:
//!   kind: kafka
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::transformer::RewriteRule;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JMX bridge endpoint configuration
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Host discovery mode (`standalone` or `orchestrated`)
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Mode specific settings: label selector and dimension readers
    #[serde(default)]
    pub spec: SpecConfig,

    /// Node agent endpoint used in orchestrated mode
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Bean whitelist; empty means every bean is collected
    #[serde(default, deserialize_with = "string_or_list")]
    pub mbeans: Vec<String>,

    /// Match `mbeans` entries as regexes instead of literals
    #[serde(default)]
    pub regex: bool,

    /// Domains that are never read
    #[serde(default)]
    pub domain_blacklist: Vec<String>,

    /// Bean substrings excluded from collection
    #[serde(default)]
    pub mbean_blacklist: Vec<String>,

    /// Ordered metric name rewrites
    #[serde(default)]
    pub rewrite: Vec<RewriteRule>,

    /// Optional prefix prepended to every metric name
    #[serde(default)]
    pub prefix: Option<String>,

    /// Metric formatter selection and options
    #[serde(default)]
    pub formatter: FormatterConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// JMX bridge endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge host used in standalone mode
    #[serde(default = "default_bridge_host")]
    pub host: String,

    /// Bridge port, shared by every discovered host
    #[serde(default = "default_bridge_port")]
    pub port: u16,

    /// Path of the bridge servlet, typically "jolokia" or "jmx"
    #[serde(default = "default_url_path")]
    pub url_path: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Depth of the listing tree; 1 lists keys only
    #[serde(default = "default_listing_max_depth")]
    pub listing_max_depth: u32,

    /// Maximum collection size per read; 0 means no limit
    #[serde(default = "default_read_limit")]
    pub read_limit: u32,
}

/// Mode specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecConfig {
    /// Labels a process must carry, with equal values, to be scraped
    #[serde(default)]
    pub label_selector: BTreeMap<String, String>,

    /// Dimension reader name to reader configuration
    #[serde(default)]
    pub dimensions: BTreeMap<String, serde_yaml::Value>,
}

/// Orchestrator node agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Node agent host
    #[serde(default = "default_orchestrator_host")]
    pub host: String,

    /// Node agent read-only port
    #[serde(default = "default_orchestrator_port")]
    pub port: u16,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// Metric formatter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Formatter kind: generic, kafka or cassandra
    #[serde(default = "default_formatter_kind")]
    pub kind: String,

    /// Inject a cluster dimension derived from the host's labels
    #[serde(default)]
    pub multiple_hosts_mode: bool,

    /// Host label holding the cluster identifier
    #[serde(default)]
    pub cluster_label: Option<String>,

    /// Statistics emitted for Kafka timer beans
    #[serde(default = "default_timer_metrics")]
    pub timer_metrics: Vec<String>,

    /// Percentiles emitted for Cassandra histograms
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<u32>,

    /// Attribute paths interpreted as Cassandra bucket histograms
    #[serde(default = "default_histogram_regex")]
    pub histogram_regex: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

// Default value functions
fn default_mode() -> String {
    "standalone".to_string()
}

fn default_bridge_host() -> String {
    "localhost".to_string()
}

fn default_bridge_port() -> u16 {
    8778
}

fn default_url_path() -> String {
    "jolokia".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_listing_max_depth() -> u32 {
    1
}

fn default_read_limit() -> u32 {
    1000
}

fn default_orchestrator_host() -> String {
    "localhost".to_string()
}

fn default_orchestrator_port() -> u16 {
    10255
}

fn default_formatter_kind() -> String {
    "generic".to_string()
}

fn default_timer_metrics() -> Vec<String> {
    [
        "StdDev",
        "75thPercentile",
        "Mean",
        "98thPercentile",
        "99thPercentile",
        "95thPercentile",
        "Max",
        "Count",
        "50thPercentile",
        "Min",
        "999thPercentile",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_percentiles() -> Vec<u32> {
    vec![50, 95, 99]
}

fn default_histogram_regex() -> String {
    ".*HistogramMicros$".to_string()
}

fn default_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Accept either a YAML list or a single pipe-delimited string
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => s
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        StringOrList::Many(v) => v,
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            mode: default_mode(),
            spec: SpecConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            mbeans: Vec::new(),
            regex: false,
            domain_blacklist: Vec::new(),
            mbean_blacklist: Vec::new(),
            rewrite: Vec::new(),
            prefix: None,
            formatter: FormatterConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_bridge_host(),
            port: default_bridge_port(),
            url_path: default_url_path(),
            timeout_ms: default_timeout(),
            listing_max_depth: default_listing_max_depth(),
            read_limit: default_read_limit(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host: default_orchestrator_host(),
            port: default_orchestrator_port(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            kind: default_formatter_kind(),
            multiple_hosts_mode: false,
            cluster_label: None,
            timer_metrics: default_timer_metrics(),
            percentiles: default_percentiles(),
            histogram_regex: default_histogram_regex(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    /// Use `Config::load_or_default()` if a missing file should fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    ///
    /// Only structural problems are rejected. Bad patterns are skipped with a
    /// warning when the collector is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.bridge.port == 0 {
            return Err(ConfigError::ValidationError(
                "Bridge port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if self.server.path == "/" || self.server.path == "/health" {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' conflicts with a built-in route",
                self.server.path
            )));
        }

        Ok(())
    }
}
