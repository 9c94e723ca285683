//! Generic JMX formatter
//!
//! `java.lang:type=GarbageCollector,name=G1 Young Generation` with leaf
//! `CollectionCount` becomes
//! `java.lang.garbagecollector.g1_young_generation.collectioncount`.

use super::{with_prefix, BeanContext, FormatterKind, MetricFormatter, NameParts};
use crate::transformer::Dimensions;

/// Formatter for arbitrary JVM beans
#[derive(Debug, Clone, Default)]
pub struct GenericFormatter {
    prefix: Option<String>,
}

impl GenericFormatter {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }
}

impl MetricFormatter for GenericFormatter {
    fn kind(&self) -> FormatterKind {
        FormatterKind::Generic
    }

    fn patch_dimensions(&self, _ctx: &BeanContext<'_>, dimensions: &mut Dimensions) -> NameParts {
        NameParts {
            metric_type: dimensions.remove("type").map(|t| t.to_lowercase()),
            name: dimensions.remove("name").map(|n| n.to_lowercase()),
        }
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
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counter_bean() {
        let fixture = Fixture::new("app.metrics:name=Requests,type=Counter");
        let sink = run(&GenericFormatter::default(), &fixture, json!({"Count": 42}));

        assert_eq!(sink.metrics.len(), 1);
        let metric = &sink.metrics[0];
        assert_eq!(metric.name, "app.metrics.counter.requests.count");
        assert_eq!(metric.value, 42.0);
        assert!(metric.is_counter);
        assert!(metric.dimensions.is_empty());
    }

    #[test]
    fn test_remaining_keys_become_dimensions() {
        let fixture = Fixture::new("kafka.log:type=Log,name=Size,topic=orders,partition=0");
        let sink = run(&GenericFormatter::default(), &fixture, json!({"Value": 1024}));

        let metric = find(&sink, "kafka.log.log.size.value");
        assert!(!metric.is_counter);
        assert_eq!(metric.dimensions.len(), 2);
        assert_eq!(metric.dimensions.get("topic").unwrap(), "orders");
        assert_eq!(metric.dimensions.get("partition").unwrap(), "0");
    }

    #[test]
    fn test_nested_attributes_extend_the_path() {
        let fixture = Fixture::new("java.lang:type=Memory");
        let sink = run(
            &GenericFormatter::default(),
            &fixture,
            json!({"HeapMemoryUsage": {"used": 100, "max": 200}, "ObjectPendingFinalizationCount": 0}),
        );

        assert_eq!(find(&sink, "java.lang.memory.heapmemoryusage.used").value, 100.0);
        assert_eq!(find(&sink, "java.lang.memory.heapmemoryusage.max").value, 200.0);
        assert!(!find(&sink, "java.lang.memory.objectpendingfinalizationcount").is_counter);
    }

    #[test]
    fn test_prefix_and_sanitization() {
        let fixture = Fixture::new("java.lang:type=GarbageCollector,name=G1 Young Generation");
        let sink = run(
            &GenericFormatter::new(Some("jvm".to_string())),
            &fixture,
            json!({"CollectionCount": 3}),
        );
        assert_eq!(
            sink.metrics[0].name,
            "jvm.java.lang.garbagecollector.g1_young_generation.collectioncount"
        );
    }

    #[test]
    fn test_nested_count_is_counter() {
        let fixture = Fixture::new("app:type=Pool");
        let sink = run(&GenericFormatter::default(), &fixture, json!({"Usage": {"Count": 5}}));
        assert!(find(&sink, "app.pool.usage.count").is_counter);
    }
}
