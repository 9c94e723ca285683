//! Cassandra formatter
//!
//! Adds two interpretations on top of the generic walk: codahale timers
//! (`Count`, `Mean`, `Min`, `Max`, `<p>thPercentile`) and the bucketed
//! latency histograms older Cassandra versions expose as plain lists, e.g.
//! `RecentReadLatencyHistogramMicros`.

use regex::Regex;
use tracing::warn;

use super::{
    emit_statistics, host_cluster, is_timer, join_path, walk_attributes, with_prefix,
    BeanContext, FormatterKind, MetricFormatter, MetricSink, NameParts,
};
use crate::collector::{AttributeMap, AttributeValue};
use crate::config::FormatterConfig;
use crate::error::RuleError;
use crate::transformer::Dimensions;

const HISTOGRAM_BUCKETS: usize = 91;

/// Upper bounds of Cassandra's estimated histogram buckets
///
/// Starts at 1 and grows by a factor of 1.2 (rounded up, at least +1).
pub fn histogram_offsets() -> Vec<u64> {
    let mut offsets = Vec::with_capacity(HISTOGRAM_BUCKETS);
    let mut last = 1u64;
    offsets.push(last);
    while offsets.len() < HISTOGRAM_BUCKETS {
        let mut next = (last * 6).div_ceil(5);
        if next == last {
            next += 1;
        }
        offsets.push(next);
        last = next;
    }
    offsets
}

/// Upper bound of the bucket holding the `percentile` point
///
/// Returns 0 for an empty histogram. Buckets beyond the offset table fall
/// into the last offset.
pub fn histogram_percentile(offsets: &[u64], buckets: &[f64], percentile: u32) -> f64 {
    let total: f64 = buckets.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let target = (total * f64::from(percentile) / 100.0).floor();
    let mut seen = 0.0;
    for (index, count) in buckets.iter().enumerate() {
        seen += count;
        if seen >= target {
            return offsets
                .get(index)
                .or_else(|| offsets.last())
                .map(|offset| *offset as f64)
                .unwrap_or_default();
        }
    }
    offsets.last().map(|offset| *offset as f64).unwrap_or_default()
}

/// Formatter for Cassandra nodes
#[derive(Debug, Clone)]
pub struct CassandraFormatter {
    prefix: Option<String>,
    percentiles: Vec<u32>,
    timer_statistics: Vec<String>,
    histogram_regex: Option<Regex>,
    offsets: Vec<u64>,
    multiple_hosts_mode: bool,
    cluster_label: Option<String>,
}

impl CassandraFormatter {
    pub fn from_config(config: &FormatterConfig, prefix: Option<String>) -> Self {
        let histogram_regex = match Regex::new(&config.histogram_regex) {
            Ok(re) => Some(re),
            Err(e) => {
                let e = RuleError::InvalidPattern {
                    pattern: config.histogram_regex.clone(),
                    source: e,
                };
                warn!(error = %e, "Histogram interpretation disabled");
                None
            }
        };

        let mut timer_statistics: Vec<String> = ["Count", "Mean", "Min", "Max"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        timer_statistics.extend(config.percentiles.iter().map(|p| format!("{}thPercentile", p)));

        Self {
            prefix,
            percentiles: config.percentiles.clone(),
            timer_statistics,
            histogram_regex,
            offsets: histogram_offsets(),
            multiple_hosts_mode: config.multiple_hosts_mode,
            cluster_label: config.cluster_label.clone(),
        }
    }
}

impl MetricFormatter for CassandraFormatter {
    fn kind(&self) -> FormatterKind {
        FormatterKind::Cassandra
    }

    fn patch_dimensions(&self, ctx: &BeanContext<'_>, dimensions: &mut Dimensions) -> NameParts {
        let parts = NameParts {
            name: dimensions.remove("name"),
            metric_type: dimensions.remove("type"),
        };

        if self.multiple_hosts_mode {
            if let Some(cluster) = host_cluster(ctx.host, self.cluster_label.as_deref()) {
                dimensions.insert("cassandra_cluster".to_string(), cluster.to_string());
            }
        }

        parts
    }

    fn patch_metric_name(
        &self,
        _ctx: &BeanContext<'_>,
        segments: Vec<String>,
        leaf_path: &str,
    ) -> Vec<String> {
        let mut segments = with_prefix(self.prefix.as_deref(), segments);
        segments.push(leaf_path.to_lowercase());
        segments
    }

    fn collect_bean(
        &self,
        ctx: &BeanContext<'_>,
        path: &str,
        attributes: &AttributeMap,
        sink: &mut MetricSink,
    ) {
        if is_timer(attributes) {
            emit_statistics(self, ctx, path, attributes, &self.timer_statistics, sink);
        } else {
            walk_attributes(self, ctx, path, attributes, sink);
        }
    }

    fn interpret_list(
        &self,
        ctx: &BeanContext<'_>,
        path: &str,
        values: &[AttributeValue],
        sink: &mut MetricSink,
    ) {
        let Some(histogram_regex) = &self.histogram_regex else {
            return;
        };
        if !histogram_regex.is_match(&format!("{}.{}", ctx.identity.raw, path)) {
            return;
        }

        let buckets: Vec<f64> = values
            .iter()
            .map(|v| v.as_f64().unwrap_or_default())
            .collect();

        for percentile in &self.percentiles {
            let value = histogram_percentile(&self.offsets, &buckets, *percentile);
            self.publish(ctx, &join_path(path, &format!("p{}", percentile)), value, sink);
        }
    }
}
