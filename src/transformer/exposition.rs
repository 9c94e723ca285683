//! Prometheus Exposition Format output
//!
//! Renders published metrics in the Prometheus text exposition format
//! (version 0.0.4).
//!
//! # Line Format
//!
//! ```text
//! # HELP <metric_name> <help_text>
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value>
//! ```
//!
//! Dotted metric names are mapped onto the Prometheus name charset, so
//! `kafka.server.BrokerTopicMetrics.MessagesInPerSec.count` becomes
//! `kafka_server_BrokerTopicMetrics_MessagesInPerSec_count`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

use super::metric::{HostBatch, PublishedMetric};

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_:]").expect("static regex"));
static INVALID_LABEL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("static regex"));

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Gauge metric - a value that can go up and down
    Gauge,
    /// Counter metric - a monotonically increasing value
    Counter,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single Prometheus sample line with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PrometheusSample {
    /// Prometheus-safe metric name
    pub name: String,
    /// Metric type
    pub metric_type: MetricType,
    /// Optional help text
    pub help: Option<String>,
    /// Labels, sorted by key
    pub labels: BTreeMap<String, String>,
    /// Sample value
    pub value: f64,
}

impl PrometheusSample {
    /// Create a gauge sample
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Gauge,
            help: None,
            labels: BTreeMap::new(),
            value,
        }
    }

    /// Set the metric type
    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Set the help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Convert a published metric read from `host`
    ///
    /// A dimension literally named `host` wins over the bridge address.
    pub fn from_published(metric: &PublishedMetric, host: &str) -> Self {
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        labels.insert("host".to_string(), host.to_string());
        for (key, value) in &metric.dimensions {
            labels.insert(prometheus_label_name(key), value.clone());
        }

        Self {
            name: prometheus_name(&metric.name),
            metric_type: if metric.is_counter {
                MetricType::Counter
            } else {
                MetricType::Gauge
            },
            help: None,
            labels,
            value: metric.value,
        }
    }
}

/// Map a dotted metric name onto the Prometheus name charset
pub fn prometheus_name(name: &str) -> String {
    let mapped = INVALID_NAME_CHARS.replace_all(name, "_").into_owned();
    if mapped.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", mapped)
    } else {
        mapped
    }
}

/// Map a dimension key onto the Prometheus label charset
pub fn prometheus_label_name(key: &str) -> String {
    let mapped = INVALID_LABEL_CHARS.replace_all(key, "_").into_owned();
    if mapped.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", mapped)
    } else {
        mapped
    }
}

/// Prometheus exposition format formatter
#[derive(Debug, Clone, Default)]
pub struct PrometheusExposition;

impl PrometheusExposition {
    /// Create a new formatter
    pub fn new() -> Self {
        Self
    }

    /// Flatten host batches into samples
    pub fn samples_from_batches(batches: &[HostBatch]) -> Vec<PrometheusSample> {
        batches
            .iter()
            .flat_map(|batch| {
                batch
                    .metrics
                    .iter()
                    .map(|metric| PrometheusSample::from_published(metric, &batch.host))
            })
            .collect()
    }

    /// Format samples into Prometheus exposition format
    ///
    /// - HELP and TYPE lines are emitted once per unique metric name
    /// - Labels are sorted alphabetically for deterministic output
    /// - Samples with the same name are grouped together
    pub fn format(&self, samples: &[PrometheusSample]) -> String {
        if samples.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(samples.len() * 100);

        for (name, group) in Self::group_by_name(samples) {
            if let Some(help) = group.iter().find_map(|s| s.help.as_ref()) {
                output.push_str(&format!("# HELP {} {}\n", name, Self::escape_help(help)));
            }
            output.push_str(&format!("# TYPE {} {}\n", name, group[0].metric_type));

            for sample in group {
                output.push_str(&Self::format_sample_line(sample));
                output.push('\n');
            }
        }

        output
    }

    /// Group samples by name, preserving order of first occurrence
    fn group_by_name(samples: &[PrometheusSample]) -> Vec<(String, Vec<&PrometheusSample>)> {
        let mut groups: HashMap<&str, Vec<&PrometheusSample>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for sample in samples {
            if !groups.contains_key(sample.name.as_str()) {
                order.push(sample.name.as_str());
            }
            groups.entry(sample.name.as_str()).or_default().push(sample);
        }

        order
            .into_iter()
            .filter_map(|name| groups.remove(name).map(|g| (name.to_string(), g)))
            .collect()
    }

    fn format_sample_line(sample: &PrometheusSample) -> String {
        let mut line = sample.name.clone();

        if !sample.labels.is_empty() {
            let label_pairs: Vec<String> = sample
                .labels
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, Self::escape_label_value(v)))
                .collect();

            line.push('{');
            line.push_str(&label_pairs.join(","));
            line.push('}');
        }

        line.push(' ');
        line.push_str(&Self::format_value(sample.value));
        line
    }

    /// Format a numeric value for Prometheus
    ///
    /// - NaN → "NaN"
    /// - ±Inf → "+Inf" / "-Inf"
    /// - Integral values are formatted without a decimal point
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
            format!("{:e}", value)
        } else {
            format!("{}", value)
        }
    }

    /// Escapes backslash and newline characters.
    fn escape_help(help: &str) -> String {
        help.replace('\\', "\\\\").replace('\n', "\\n")
    }

    /// Escapes backslash, double-quote, and newline characters.
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
