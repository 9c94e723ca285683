//! Metric formatters
//!
//! A formatter turns a bean identity plus a numeric leaf of its attribute
//! tree into a [`PublishedMetric`]. The traversal engine is shared; each
//! technology only overrides the hooks of [`MetricFormatter`]:
//!
//! - [`MetricFormatter::patch_dimensions`]: consume identity keys into the
//!   name and synthesize extra dimensions
//! - [`MetricFormatter::patch_metric_name`]: assemble the name segments
//! - [`MetricFormatter::collect_bean`]: interpret a whole attribute map
//!   (timers, meters) before falling back to the generic walk
//! - [`MetricFormatter::interpret_list`]: give meaning to list attributes
//!
//! # Example
//!
//! ```ignore
//! let formatter = formatter_from_config(&config.formatter, config.prefix.clone());
//! let mut sink = MetricSink::default();
//! formatter.collect_bean(&ctx, "", &attributes, &mut sink);
//! ```

mod cassandra;
mod generic;
mod kafka;

pub use cassandra::{histogram_offsets, CassandraFormatter};
pub use generic::GenericFormatter;
pub use kafka::KafkaFormatter;

use tracing::{debug, warn};

use crate::collector::{AttributeMap, AttributeValue, BeanIdentity};
use crate::config::FormatterConfig;
use crate::discovery::Host;
use crate::transformer::{Dimensions, NameSanitizer, PublishedMetric};

/// Everything a formatter may look at for one bean
#[derive(Debug, Clone, Copy)]
pub struct BeanContext<'a> {
    /// Parsed bean identity
    pub identity: &'a BeanIdentity,
    /// Host the bean was read from
    pub host: &'a Host,
    /// Dimensions computed for the host this cycle
    pub host_dimensions: &'a Dimensions,
    /// Shared name sanitizer
    pub sanitizer: &'a NameSanitizer,
}

/// Identity keys consumed into the metric name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    /// Value of the `type` key, if consumed
    pub metric_type: Option<String>,
    /// Value of the `name` key, if consumed
    pub name: Option<String>,
}

/// Collects the output of one bean walk
#[derive(Debug, Default)]
pub struct MetricSink {
    /// Published metrics, in walk order
    pub metrics: Vec<PublishedMetric>,
    /// Metrics whose name sanitized to the empty string
    pub dropped: u64,
}

impl MetricSink {
    /// Record a classification result
    pub fn emit(&mut self, metric: Option<PublishedMetric>) {
        match metric {
            Some(metric) => self.metrics.push(metric),
            None => self.dropped += 1,
        }
    }
}

/// Formatter variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatterKind {
    Generic,
    Kafka,
    Cassandra,
}

impl FormatterKind {
    /// Resolve a configured kind, defaulting to generic
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "generic" => FormatterKind::Generic,
            "kafka" => FormatterKind::Kafka,
            "cassandra" => FormatterKind::Cassandra,
            other => {
                warn!(formatter = %other, "Unknown formatter; defaulting to generic");
                FormatterKind::Generic
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatterKind::Generic => "generic",
            FormatterKind::Kafka => "kafka",
            FormatterKind::Cassandra => "cassandra",
        }
    }
}

/// Build the configured formatter
pub fn formatter_from_config(
    config: &FormatterConfig,
    prefix: Option<String>,
) -> Box<dyn MetricFormatter> {
    match FormatterKind::from_name(&config.kind) {
        FormatterKind::Generic => Box::new(GenericFormatter::new(prefix)),
        FormatterKind::Kafka => Box::new(KafkaFormatter::from_config(config, prefix)),
        FormatterKind::Cassandra => Box::new(CassandraFormatter::from_config(config, prefix)),
    }
}

/// Per-technology metric interpretation
pub trait MetricFormatter: Send + Sync {
    /// Formatter variant
    fn kind(&self) -> FormatterKind;

    /// Consume identity keys into the name and add synthesized dimensions
    fn patch_dimensions(&self, ctx: &BeanContext<'_>, dimensions: &mut Dimensions) -> NameParts;

    /// Final name segments from `[domain, type?, name?]` and the leaf path
    fn patch_metric_name(
        &self,
        ctx: &BeanContext<'_>,
        segments: Vec<String>,
        leaf_path: &str,
    ) -> Vec<String>;

    /// Classify one numeric leaf
    ///
    /// Returns `None` when the sanitized name is empty.
    fn classify(&self, ctx: &BeanContext<'_>, leaf_path: &str, value: f64) -> Option<PublishedMetric> {
        let mut bean_dimensions = ctx.identity.properties.clone();
        let parts = self.patch_dimensions(ctx, &mut bean_dimensions);

        let mut segments = vec![ctx.identity.domain.clone()];
        segments.extend(parts.metric_type);
        segments.extend(parts.name);
        let segments = self.patch_metric_name(ctx, segments, leaf_path);

        let name = ctx.sanitizer.clean(&segments.join("."));
        if name.is_empty() {
            debug!(bean = %ctx.identity.raw, leaf = %leaf_path, "Metric name rewritten to empty; dropped");
            return None;
        }

        let mut dimensions = ctx.host_dimensions.clone();
        dimensions.extend(bean_dimensions);

        Some(PublishedMetric {
            name,
            value,
            is_counter: is_counter_leaf(leaf_path),
            dimensions,
        })
    }

    /// Classify one leaf into `sink`
    fn publish(&self, ctx: &BeanContext<'_>, leaf_path: &str, value: f64, sink: &mut MetricSink) {
        sink.emit(self.classify(ctx, leaf_path, value));
    }

    /// Interpret the attribute map found at `path` (empty for the bean root)
    fn collect_bean(
        &self,
        ctx: &BeanContext<'_>,
        path: &str,
        attributes: &AttributeMap,
        sink: &mut MetricSink,
    ) {
        walk_attributes(self, ctx, path, attributes, sink);
    }

    /// Interpret a list attribute; ignored by default
    fn interpret_list(
        &self,
        _ctx: &BeanContext<'_>,
        _path: &str,
        _values: &[AttributeValue],
        _sink: &mut MetricSink,
    ) {
    }
}

/// Generic attribute walk
///
/// Numeric leaves are published, nested maps go back through
/// [`MetricFormatter::collect_bean`], lists through
/// [`MetricFormatter::interpret_list`]. Strings, booleans and nulls are
/// ignored.
pub fn walk_attributes<F: MetricFormatter + ?Sized>(
    formatter: &F,
    ctx: &BeanContext<'_>,
    path: &str,
    attributes: &AttributeMap,
    sink: &mut MetricSink,
) {
    for (key, value) in attributes {
        let child = join_path(path, key);
        match value {
            AttributeValue::Integer(_) | AttributeValue::Float(_) => {
                if let Some(number) = value.as_f64() {
                    formatter.publish(ctx, &child, number, sink);
                }
            }
            AttributeValue::Object(nested) => formatter.collect_bean(ctx, &child, nested, sink),
            AttributeValue::Array(items) => formatter.interpret_list(ctx, &child, items, sink),
            _ => {}
        }
    }
}

/// Publish the named statistics of a timer-shaped map
///
/// Each statistic becomes leaf `<path>.<stat lower-cased>`. Absent,
/// non-numeric and zero values are skipped.
pub fn emit_statistics<F: MetricFormatter + ?Sized>(
    formatter: &F,
    ctx: &BeanContext<'_>,
    path: &str,
    attributes: &AttributeMap,
    statistics: &[String],
    sink: &mut MetricSink,
) {
    for statistic in statistics {
        let Some(value) = attributes.get(statistic).and_then(AttributeValue::as_f64) else {
            continue;
        };
        if value == 0.0 {
            continue;
        }
        formatter.publish(ctx, &join_path(path, &statistic.to_lowercase()), value, sink);
    }
}

/// Whether a map has the `Count` and `Mean` attributes of a timer
pub fn is_timer(attributes: &AttributeMap) -> bool {
    attributes.contains_key("Count") && attributes.contains_key("Mean")
}

/// Leaf whose last segment is `count`, in any case
pub fn is_counter_leaf(leaf_path: &str) -> bool {
    leaf_path
        .rsplit('.')
        .next()
        .is_some_and(|last| last.eq_ignore_ascii_case("count"))
}

/// Join a dotted attribute path
pub fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Prepend the configured prefix, if any
pub fn with_prefix(prefix: Option<&str>, segments: Vec<String>) -> Vec<String> {
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            let mut prefixed = Vec::with_capacity(segments.len() + 1);
            prefixed.push(prefix.to_string());
            prefixed.extend(segments);
            prefixed
        }
        _ => segments,
    }
}

/// Value of the host label naming its cluster
pub fn host_cluster<'a>(host: &'a Host, cluster_label: Option<&str>) -> Option<&'a str> {
    cluster_label
        .and_then(|label| host.labels.get(label))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Owns everything a [`BeanContext`] borrows
    pub struct Fixture {
        pub identity: BeanIdentity,
        pub host: Host,
        pub host_dimensions: Dimensions,
        pub sanitizer: NameSanitizer,
    }

    impl Fixture {
        pub fn new(bean: &str) -> Self {
            Self {
                identity: BeanIdentity::parse(bean).unwrap(),
                host: Host::new("10.0.0.1"),
                host_dimensions: Dimensions::new(),
                sanitizer: NameSanitizer::default(),
            }
        }

        pub fn ctx(&self) -> BeanContext<'_> {
            BeanContext {
                identity: &self.identity,
                host: &self.host,
                host_dimensions: &self.host_dimensions,
                sanitizer: &self.sanitizer,
            }
        }
    }

    pub fn attributes(value: serde_json::Value) -> AttributeMap {
        match value {
            serde_json::Value::Object(map) => crate::collector::attribute_map(map),
            _ => panic!("expected object"),
        }
    }

    pub fn run<F: MetricFormatter + ?Sized>(
        formatter: &F,
        fixture: &Fixture,
        value: serde_json::Value,
    ) -> MetricSink {
        let mut sink = MetricSink::default();
        formatter.collect_bean(&fixture.ctx(), "", &attributes(value), &mut sink);
        sink
    }

    pub fn find<'a>(sink: &'a MetricSink, name: &str) -> &'a PublishedMetric {
        sink.metrics
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("metric {} not published", name))
    }
}
