//! Bridge traversal integration tests
//!
//! Runs full collection cycles against a wiremock stand-in for the JMX
//! bridge and checks what gets published.

use std::sync::Arc;

use rjmx_collector::collector::Collector;
use rjmx_collector::config::Config;
use rjmx_collector::metrics::CollectorMetrics;
use rjmx_collector::transformer::{HostBatch, PrometheusExposition, PublishedMetric, RewriteRule};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOST: &str = "127.0.0.1";

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.bridge.host = HOST.to_string();
    config.bridge.port = server.address().port();
    config
}

fn collector(config: &Config) -> (Collector, Arc<CollectorMetrics>) {
    let metrics = Arc::new(CollectorMetrics::new());
    let collector = Collector::from_config(config, metrics.clone()).expect("collector");
    (collector, metrics)
}

fn find<'a>(batch: &'a HostBatch, name: &str) -> &'a PublishedMetric {
    batch
        .metrics
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("metric {} not published: {:?}", name, batch.metrics))
}

async fn mount_listing(server: &MockServer, domains: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/jolokia/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "timestamp": 1700000000,
            "value": domains
        })))
        .mount(server)
        .await;
}

async fn mount_read(server: &MockServer, target: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .and(query_param("p", format!("read/{}", target)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_generic_cycle_end_to_end() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!({"app.metrics": {}, "java.lang": {}, "jolokia": {}}),
    )
    .await;
    mount_read(
        &server,
        "app.metrics:*",
        json!({
            "status": 200,
            "value": {"app.metrics:type=Counter,name=Requests": {"Count": 42}}
        }),
    )
    .await;
    mount_read(
        &server,
        "java.lang:*",
        json!({
            "status": 200,
            "value": {
                "java.lang:type=Memory": {
                    "HeapMemoryUsage": {"used": 1024, "max": 4096},
                    "Verbose": false,
                    "ObjectName": {"objectName": "java.lang:type=Memory"}
                }
            }
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .and(query_param("p", "read/jolokia:*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (mut collector, _) = collector(&config_for(&server));
    let batches = collector.collect().await;

    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.host, HOST);
    assert_eq!(batch.metrics.len(), 3);

    let requests = find(batch, "app.metrics.counter.requests.count");
    assert_eq!(requests.value, 42.0);
    assert!(requests.is_counter);
    assert!(requests.dimensions.is_empty());

    let used = find(batch, "java.lang.memory.heapmemoryusage.used");
    assert_eq!(used.value, 1024.0);
    assert!(!used.is_counter);
    assert_eq!(find(batch, "java.lang.memory.heapmemoryusage.max").value, 4096.0);

    let exposition =
        PrometheusExposition::new().format(&PrometheusExposition::samples_from_batches(&batches));
    assert!(exposition.contains("# TYPE app_metrics_counter_requests_count counter"));
    assert!(exposition.contains("java_lang_memory_heapmemoryusage_used{host=\"127.0.0.1\"} 1024"));
}

#[tokio::test]
async fn test_bean_keys_become_dimensions() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"app": {}})).await;
    mount_read(
        &server,
        "app:*",
        json!({
            "status": 200,
            "value": {"app:type=Pool,name=Workers,shard=3": {"Active": 7}}
        }),
    )
    .await;

    let (mut collector, _) = collector(&config_for(&server));
    let batches = collector.collect().await;

    let metric = find(&batches[0], "app.pool.workers.active");
    assert_eq!(metric.dimensions.len(), 1);
    assert_eq!(metric.dimensions.get("shard").unwrap(), "3");
}

#[tokio::test]
async fn test_listing_cursor_and_stale_domains() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jolokia/list"))
        .and(query_param("ifModifiedSince", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "timestamp": 1700000000,
            "value": {"app": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jolokia/list"))
        .and(query_param("ifModifiedSince", "1700000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 304,
            "timestamp": 1700000060
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_read(
        &server,
        "app:*",
        json!({"status": 200, "value": {"app:type=Queue": {"Size": 3}}}),
    )
    .await;

    let (mut collector, metrics) = collector(&config_for(&server));

    let first = collector.collect().await;
    assert_eq!(find(&first[0], "app.queue.size").value, 3.0);

    // Not modified: cached domains are read again, cursor stays put
    let second = collector.collect().await;
    assert_eq!(find(&second[0], "app.queue.size").value, 3.0);

    let cache = collector.listing_cache(HOST).unwrap();
    assert_eq!(cache.cursor(), 1700000000);
    assert_eq!(cache.domain_keys(), &["app".to_string()]);
    assert_eq!(metrics.host(HOST).listing_success_total.get(), 2);
}

#[tokio::test]
async fn test_listing_http_failure_skips_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jolokia/list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (mut collector, metrics) = collector(&config_for(&server));
    let batches = collector.collect().await;

    assert_eq!(batches.len(), 1);
    assert!(batches[0].metrics.is_empty());
    assert_eq!(metrics.host(HOST).listing_failure_total.get(), 1);
}

#[tokio::test]
async fn test_listing_failure_keeps_previous_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jolokia/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "timestamp": 1700000000,
            "value": {"app.metrics": {}}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jolokia/list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_read(
        &server,
        "app.metrics:*",
        json!({"status": 200, "value": {"app.metrics:type=Gauge": {"Value": 3}}}),
    )
    .await;

    let (mut collector, metrics) = collector(&config_for(&server));

    let first = collector.collect().await;
    assert_eq!(first[0].metrics.len(), 1);
    let before = collector.listing_cache(HOST).unwrap().clone();
    assert_eq!(before.cursor(), 1700000000);

    let second = collector.collect().await;
    assert!(second[0].metrics.is_empty());
    assert_eq!(collector.listing_cache(HOST).unwrap(), &before);
    assert_eq!(metrics.host(HOST).listing_success_total.get(), 1);
    assert_eq!(metrics.host(HOST).listing_failure_total.get(), 1);

    let listings: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/jolokia/list")
        .collect();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].url.query(), Some("ifModifiedSince=0&maxDepth=1"));
    assert_eq!(
        listings[1].url.query(),
        Some("ifModifiedSince=1700000000&maxDepth=1")
    );
}

#[tokio::test]
async fn test_failed_domain_read_is_isolated() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"broken": {}, "healthy": {}})).await;
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .and(query_param("p", "read/broken:*"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_read(
        &server,
        "healthy:*",
        json!({"status": 200, "value": {"healthy:type=Gauge": {"Value": 1.5}}}),
    )
    .await;

    let (mut collector, metrics) = collector(&config_for(&server));
    let batches = collector.collect().await;

    assert_eq!(batches[0].metrics.len(), 1);
    assert_eq!(find(&batches[0], "healthy.gauge.value").value, 1.5);
    assert_eq!(metrics.host(HOST).read_failure_total.get(), 1);
}

#[tokio::test]
async fn test_non_200_read_is_no_data() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"app": {}})).await;
    mount_read(
        &server,
        "app:*",
        json!({"status": 404, "error": "javax.management.InstanceNotFoundException"}),
    )
    .await;

    let (mut collector, metrics) = collector(&config_for(&server));
    let batches = collector.collect().await;

    assert!(batches[0].metrics.is_empty());
    assert_eq!(metrics.host(HOST).read_failure_total.get(), 1);
}

#[tokio::test]
async fn test_domain_blacklist() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"noisy": {}, "app": {}})).await;
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .and(query_param("p", "read/noisy:*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_read(
        &server,
        "app:*",
        json!({"status": 200, "value": {"app:type=A": {"Value": 1}}}),
    )
    .await;

    let mut config = config_for(&server);
    config.domain_blacklist = vec!["noisy".to_string()];

    let (mut collector, _) = collector(&config);
    let batches = collector.collect().await;
    assert_eq!(batches[0].metrics.len(), 1);
}

#[tokio::test]
async fn test_mbean_blacklist_uses_scoped_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"app.metrics": {}})).await;
    Mock::given(method("GET"))
        .and(path("/jolokia/list/app.metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "value": {"type=Secret": {}, "name=X,type=Public": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .and(query_param("p", "read/app.metrics:*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jolokia/"))
        .and(query_param("p", "read/app.metrics:type=Secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_read(
        &server,
        "app.metrics:name=X,type=Public",
        json!({"status": 200, "value": {"Value": 5}}),
    )
    .await;

    let mut config = config_for(&server);
    config.mbean_blacklist = vec!["app.metrics:type=Secret".to_string()];

    let (mut collector, _) = collector(&config);
    let batches = collector.collect().await;

    assert_eq!(batches[0].metrics.len(), 1);
    assert_eq!(find(&batches[0], "app.metrics.public.x.value").value, 5.0);
}

#[tokio::test]
async fn test_whitelist_restricts_beans() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"java.lang": {}})).await;
    mount_read(
        &server,
        "java.lang:*",
        json!({
            "status": 200,
            "value": {
                "java.lang:type=Memory": {"ObjectPendingFinalizationCount": 0},
                "java.lang:type=Threading": {"ThreadCount": 25}
            }
        }),
    )
    .await;

    let mut config = config_for(&server);
    config.mbeans = vec!["java.lang:type=Threading".to_string()];

    let (mut collector, _) = collector(&config);
    let batches = collector.collect().await;

    assert_eq!(batches[0].metrics.len(), 1);
    assert_eq!(find(&batches[0], "java.lang.threading.threadcount").value, 25.0);
}

#[tokio::test]
async fn test_rewrites_and_prefix() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"app": {}})).await;
    mount_read(
        &server,
        "app:*",
        json!({
            "status": 200,
            "value": {
                "app:type=Cache": {"Hits": 10},
                "app:type=Internal": {"Noise": 1}
            }
        }),
    )
    .await;

    let mut config = config_for(&server);
    config.prefix = Some("svc".to_string());
    config.rewrite = vec![
        RewriteRule::new(r"^svc\.app\.internal\..*$", ""),
        RewriteRule::new(r"\.cache\.", ".c."),
    ];

    let (mut collector, metrics) = collector(&config);
    let batches = collector.collect().await;

    assert_eq!(batches[0].metrics.len(), 1);
    assert_eq!(find(&batches[0], "svc.app.c.hits").value, 10.0);
    assert_eq!(metrics.dropped_total.get(), 1);
}

#[tokio::test]
async fn test_kafka_total_topic() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"kafka.server": {}})).await;
    mount_read(
        &server,
        "kafka.server:*",
        json!({
            "status": 200,
            "value": {
                "kafka.server:name=BytesInPerSec,type=BrokerTopicMetrics": {
                    "Count": 1000, "MeanRate": 12.5, "RateUnit": "SECONDS"
                },
                "kafka.server:name=BytesInPerSec,topic=orders,type=BrokerTopicMetrics": {
                    "Count": 400, "MeanRate": 2.5
                }
            }
        }),
    )
    .await;

    let mut config = config_for(&server);
    config.formatter.kind = "kafka".to_string();

    let (mut collector, _) = collector(&config);
    let batches = collector.collect().await;

    let metrics = &batches[0].metrics;
    assert_eq!(metrics.len(), 2);
    assert!(metrics.iter().all(|m| m.name == "kafka.server.BrokerTopicMetrics.BytesInPerSec.count"));
    assert!(metrics.iter().all(|m| m.is_counter));

    let total = metrics
        .iter()
        .find(|m| m.dimensions.get("topic").map(String::as_str) == Some("_TOTAL_"))
        .unwrap();
    assert_eq!(total.value, 1000.0);

    let orders = metrics
        .iter()
        .find(|m| m.dimensions.get("topic").map(String::as_str) == Some("orders"))
        .unwrap();
    assert_eq!(orders.value, 400.0);
}

#[tokio::test]
async fn test_cassandra_histogram_list() {
    let server = MockServer::start().await;
    mount_listing(&server, json!({"org.apache.cassandra.db": {}})).await;
    mount_read(
        &server,
        "org.apache.cassandra.db:*",
        json!({
            "status": 200,
            "value": {
                "org.apache.cassandra.db:type=ColumnFamilies,keyspace=ks,columnfamily=users": {
                    "RecentReadLatencyHistogramMicros": [0, 10, 0, 10],
                    "LiveSSTableCount": 4
                }
            }
        }),
    )
    .await;

    let mut config = config_for(&server);
    config.formatter.kind = "cassandra".to_string();

    let (mut collector, _) = collector(&config);
    let batches = collector.collect().await;
    let batch = &batches[0];

    let base = "org.apache.cassandra.db.ColumnFamilies";
    assert_eq!(find(batch, &format!("{}.livesstablecount", base)).value, 4.0);
    assert_eq!(
        find(batch, &format!("{}.recentreadlatencyhistogrammicros.p50", base)).value,
        2.0
    );
    assert_eq!(
        find(batch, &format!("{}.recentreadlatencyhistogrammicros.p99", base)).value,
        4.0
    );
}
