//! Metric name transformation and output
//!
//! This module holds the pieces shared by every metric formatter: the ordered
//! rewrite rules, the name sanitizer, the published metric record, and the
//! Prometheus text exposition used by the HTTP surface.

pub mod exposition;
pub mod metric;
pub mod rules;
pub mod sanitizer;

pub use exposition::{MetricType, PrometheusExposition, PrometheusSample};
pub use metric::{Dimensions, HostBatch, PublishedMetric};
pub use rules::{RewriteRule, RewriteRules};
pub use sanitizer::NameSanitizer;
