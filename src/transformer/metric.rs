//! Published metric records
//!
//! The record handed to the publishing side: a sanitized dotted name, the
//! numeric value, whether it is a monotonic counter, and its dimensions.

use serde::Serialize;
use std::collections::BTreeMap;

/// Dimension key to value
pub type Dimensions = BTreeMap<String, String>;

/// A classified, sanitized metric ready for publication
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedMetric {
    /// Sanitized dotted metric name
    pub name: String,
    /// Metric value
    pub value: f64,
    /// Monotonic counter (true) or point-in-time gauge (false)
    pub is_counter: bool,
    /// Classification tags
    pub dimensions: Dimensions,
}

#[cfg(test)]
impl PublishedMetric {
    /// Create a gauge with no dimensions
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            is_counter: false,
            dimensions: Dimensions::new(),
        }
    }

    /// Create a counter with no dimensions
    pub fn counter(name: impl Into<String>, value: f64) -> Self {
        Self {
            is_counter: true,
            ..Self::gauge(name, value)
        }
    }

    /// Add a dimension
    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }
}

/// Metrics collected from one host during a cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostBatch {
    /// Bridge address the metrics were read from
    pub host: String,
    /// Metrics in traversal order
    pub metrics: Vec<PublishedMetric>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_builders() {
        let metric = PublishedMetric::counter("app.requests.count", 42.0)
            .with_dimension("topic", "orders");
        assert!(metric.is_counter);
        assert_eq!(metric.value, 42.0);
        assert_eq!(metric.dimensions.get("topic").unwrap(), "orders");

        assert!(!PublishedMetric::gauge("app.heap.used", 1.0).is_counter);
    }

    #[test]
    fn test_metric_serializes() {
        let metric = PublishedMetric::gauge("a.b", 1.5).with_dimension("k", "v");
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["name"], "a.b");
        assert_eq!(json["is_counter"], false);
        assert_eq!(json["dimensions"]["k"], "v");
    }
}
