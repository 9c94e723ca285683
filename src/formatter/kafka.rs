//! Kafka broker formatter
//!
//! Kafka exposes yammer metrics: timers carry `Count`, `Mean` and
//! percentiles, meters carry `Count` plus rates. Timers emit the configured
//! statistics, meters only their count.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    emit_statistics, host_cluster, is_timer, join_path, walk_attributes, with_prefix,
    BeanContext, FormatterKind, MetricFormatter, MetricSink, NameParts,
};
use crate::collector::AttributeMap;
use crate::config::FormatterConfig;
use crate::transformer::Dimensions;

/// Broker-wide per-second metrics, aggregated over every topic
static TOTAL_TOPICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^kafka\.server:name=.*PerSec,type=BrokerTopicMetrics").expect("static regex")
});

const TOTAL_TOPIC: &str = "_TOTAL_";
const CLUSTER_PREFIX: &str = "kafka-k8s";

/// Formatter for Kafka brokers
#[derive(Debug, Clone)]
pub struct KafkaFormatter {
    prefix: Option<String>,
    timer_metrics: Vec<String>,
    multiple_hosts_mode: bool,
    cluster_label: Option<String>,
}

impl KafkaFormatter {
    pub fn from_config(config: &FormatterConfig, prefix: Option<String>) -> Self {
        Self {
            prefix,
            timer_metrics: config.timer_metrics.clone(),
            multiple_hosts_mode: config.multiple_hosts_mode,
            cluster_label: config.cluster_label.clone(),
        }
    }
}

impl MetricFormatter for KafkaFormatter {
    fn kind(&self) -> FormatterKind {
        FormatterKind::Kafka
    }

    fn patch_dimensions(&self, ctx: &BeanContext<'_>, dimensions: &mut Dimensions) -> NameParts {
        let parts = NameParts {
            name: dimensions.remove("name"),
            metric_type: dimensions.remove("type"),
        };

        if TOTAL_TOPICS.is_match(&ctx.identity.raw) && !dimensions.contains_key("topic") {
            dimensions.insert("topic".to_string(), TOTAL_TOPIC.to_string());
        }

        if self.multiple_hosts_mode {
            if let Some(cluster) = host_cluster(ctx.host, self.cluster_label.as_deref()) {
                let cluster = cluster.strip_prefix(CLUSTER_PREFIX).unwrap_or(cluster);
                dimensions.insert("kafka_cluster".to_string(), cluster.to_string());
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
            emit_statistics(self, ctx, path, attributes, &self.timer_metrics, sink);
        } else if let Some(count) = attributes.get("Count") {
            if let Some(value) = count.as_f64() {
                self.publish(ctx, &join_path(path, "count"), value, sink);
            }
        } else {
            walk_attributes(self, ctx, path, attributes, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use serde_json::json;

    fn formatter() -> KafkaFormatter {
        KafkaFormatter::from_config(&FormatterConfig::default(), None)
    }

    #[test]
    fn test_meter_emits_count_only() {
        let fixture = Fixture::new("kafka.server:name=BytesInPerSec,topic=orders,type=BrokerTopicMetrics");
        let sink = run(
            &formatter(),
            &fixture,
            json!({"Count": 1000, "MeanRate": 12.5, "OneMinuteRate": 10.0, "RateUnit": "SECONDS"}),
        );

        assert_eq!(sink.metrics.len(), 1);
        let metric = &sink.metrics[0];
        assert_eq!(metric.name, "kafka.server.BrokerTopicMetrics.BytesInPerSec.count");
        assert!(metric.is_counter);
        assert_eq!(metric.dimensions.get("topic").unwrap(), "orders");
    }

    #[test]
    fn test_total_topic_dimension() {
        let fixture = Fixture::new("kafka.server:name=BytesInPerSec,type=BrokerTopicMetrics");
        let sink = run(&formatter(), &fixture, json!({"Count": 1000, "MeanRate": 12.5}));

        let metric = find(&sink, "kafka.server.BrokerTopicMetrics.BytesInPerSec.count");
        assert_eq!(metric.dimensions.get("topic").unwrap(), "_TOTAL_");
        assert_eq!(metric.dimensions.len(), 1);
    }

    #[test]
    fn test_other_beans_get_no_total_topic() {
        let fixture = Fixture::new("kafka.server:name=UnderReplicatedPartitions,type=ReplicaManager");
        let sink = run(&formatter(), &fixture, json!({"Value": 0}));

        let metric = find(&sink, "kafka.server.ReplicaManager.UnderReplicatedPartitions.value");
        assert!(metric.dimensions.is_empty());
        assert!(!metric.is_counter);
    }

    #[test]
    fn test_timer_emits_configured_statistics() {
        let fixture = Fixture::new("kafka.network:name=TotalTimeMs,request=Produce,type=RequestMetrics");
        let sink = run(
            &formatter(),
            &fixture,
            json!({
                "Count": 50,
                "Mean": 2.5,
                "Max": 10.0,
                "Min": 0.0,
                "StdDev": 1.1,
                "50thPercentile": 2.0,
                "99thPercentile": 9.0,
                "LatencyUnit": "MILLISECONDS"
            }),
        );

        let names: Vec<&str> = sink.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "kafka.network.RequestMetrics.TotalTimeMs.stddev",
                "kafka.network.RequestMetrics.TotalTimeMs.mean",
                "kafka.network.RequestMetrics.TotalTimeMs.99thpercentile",
                "kafka.network.RequestMetrics.TotalTimeMs.max",
                "kafka.network.RequestMetrics.TotalTimeMs.count",
                "kafka.network.RequestMetrics.TotalTimeMs.50thpercentile",
            ]
        );
        assert!(find(&sink, "kafka.network.RequestMetrics.TotalTimeMs.count").is_counter);
        assert!(!find(&sink, "kafka.network.RequestMetrics.TotalTimeMs.mean").is_counter);
        assert_eq!(
            find(&sink, "kafka.network.RequestMetrics.TotalTimeMs.mean")
                .dimensions
                .get("request")
                .unwrap(),
            "Produce"
        );
    }

    #[test]
    fn test_cluster_dimension_in_multiple_hosts_mode() {
        let config = FormatterConfig {
            multiple_hosts_mode: true,
            cluster_label: Some("paasta.yelp.com/cluster".to_string()),
            ..FormatterConfig::default()
        };
        let formatter = KafkaFormatter::from_config(&config, None);

        let mut fixture = Fixture::new("kafka.server:name=Value,type=KafkaServer");
        fixture.host = fixture
            .host
            .clone()
            .with_label("paasta.yelp.com/cluster", "kafka-k8s-main");

        let sink = run(&formatter, &fixture, json!({"Value": 3}));
        assert_eq!(sink.metrics[0].dimensions.get("kafka_cluster").unwrap(), "-main");
    }

    #[test]
    fn test_no_cluster_dimension_by_default() {
        let mut fixture = Fixture::new("kafka.server:name=Value,type=KafkaServer");
        fixture.host = fixture.host.clone().with_label("cluster", "kafka-k8s-main");
        let sink = run(&formatter(), &fixture, json!({"Value": 3}));
        assert!(sink.metrics[0].dimensions.is_empty());
    }

    #[test]
    fn test_prefix() {
        let formatter = KafkaFormatter::from_config(&FormatterConfig::default(), Some("kafka".into()));
        let fixture = Fixture::new("kafka.server:name=Value,type=KafkaServer");
        let sink = run(&formatter, &fixture, json!({"Value": 3}));
        assert_eq!(sink.metrics[0].name, "kafka.kafka.server.KafkaServer.Value.value");
    }
}
