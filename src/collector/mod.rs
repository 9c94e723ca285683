//! JMX 브리지 메트릭 수집 모듈
//!
//! 각 수집 주기마다 호스트 목록을 읽고, 호스트별 디멘션을 한 번에 조회한 뒤,
//! 호스트마다 브리지의 도메인 목록을 조회하고 빈 속성 트리를 순회합니다.
//!
//! # Example
//!
//! ```ignore
//! use rjmx_collector::collector::Collector;
//!
//! let mut collector = Collector::from_config(&config, metrics)?;
//! let batches = collector.collect().await;
//! ```

mod cache;
mod client;
mod filter;
mod parser;
mod traversal;

pub use cache::ListingCache;
pub use client::{escape_domain, BridgeClient};
pub use filter::{BeanFilters, Whitelist, IGNORE_DOMAINS};
pub use parser::{
    attribute_map, parse_response, AttributeMap, AttributeValue, BeanIdentity, BridgeResponse,
    CollectResult,
};
pub use traversal::{HostScrape, ScrapeOutcome};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::discovery::{
    host_reader_for_mode, CompositeDimensionReader, DimensionReader, HostReader, KubeletClient,
    Mode, ProcessSource,
};
use crate::formatter::{formatter_from_config, MetricFormatter};
use crate::metrics::CollectorMetrics;
use crate::transformer::{Dimensions, HostBatch, NameSanitizer};

/// Collector 구조체 - 수집 주기 드라이버
///
/// 호스트별 목록 캐시를 소유하므로 한 번에 하나의 주기만 실행됩니다.
pub struct Collector {
    client: BridgeClient,
    host_reader: Box<dyn HostReader>,
    dimension_reader: Box<dyn DimensionReader>,
    formatter: Box<dyn MetricFormatter>,
    filters: BeanFilters,
    sanitizer: NameSanitizer,
    /// 호스트 주소별 목록 캐시
    caches: HashMap<String, ListingCache>,
    metrics: Arc<CollectorMetrics>,
}

impl Collector {
    /// 설정으로부터 Collector 생성
    pub fn from_config(config: &Config, metrics: Arc<CollectorMetrics>) -> CollectResult<Self> {
        let source: Arc<dyn ProcessSource> = Arc::new(KubeletClient::new(&config.orchestrator)?);

        let host_reader = host_reader_for_mode(
            Mode::from_name(&config.mode),
            &config.bridge.host,
            &config.spec.label_selector,
            source.clone(),
        );
        let dimension_reader = CompositeDimensionReader::from_config(&config.spec.dimensions, source);

        Ok(Self::new(
            BridgeClient::new(&config.bridge)?,
            host_reader,
            Box::new(dimension_reader),
            formatter_from_config(&config.formatter, config.prefix.clone()),
            BeanFilters::from_config(config),
            NameSanitizer::new(config.rewrite.clone()),
            metrics,
        ))
    }

    /// 구성 요소로부터 Collector 생성
    pub fn new(
        client: BridgeClient,
        host_reader: Box<dyn HostReader>,
        dimension_reader: Box<dyn DimensionReader>,
        formatter: Box<dyn MetricFormatter>,
        filters: BeanFilters,
        sanitizer: NameSanitizer,
        metrics: Arc<CollectorMetrics>,
    ) -> Self {
        Self {
            client,
            host_reader,
            dimension_reader,
            formatter,
            filters,
            sanitizer,
            caches: HashMap::new(),
            metrics,
        }
    }

    /// 한 주기 수집 - 호스트별 배치 반환
    ///
    /// 호스트는 순서대로 처리됩니다. 실패한 호출은 해당 작업 단위의 데이터만
    /// 잃으며 주기를 중단하지 않습니다.
    pub async fn collect(&mut self) -> Vec<HostBatch> {
        let hosts = self.host_reader.read().await;
        self.metrics.hosts_discovered.set(hosts.len() as f64);
        debug!(reader = self.host_reader.name(), hosts = hosts.len(), "Hosts discovered");

        let host_dimensions = self.dimension_reader.read(&hosts).await;

        // 이번 주기에 없는 호스트의 캐시와 메트릭은 버림
        let current: HashSet<&str> = hosts.iter().map(|h| h.address.as_str()).collect();
        self.caches.retain(|address, _| current.contains(address.as_str()));
        self.metrics.retain_hosts(&current);

        let empty = Dimensions::new();
        let mut batches = Vec::with_capacity(hosts.len());

        for host in &hosts {
            let dimensions = host_dimensions.get(&host.address).unwrap_or(&empty);
            let cache = self.caches.entry(host.address.clone()).or_default();

            let start = Instant::now();
            let outcome = HostScrape::new(
                &self.client,
                &self.filters,
                self.formatter.as_ref(),
                &self.sanitizer,
                host,
                dimensions,
            )
            .run(cache)
            .await;
            let elapsed = start.elapsed().as_secs_f64();

            self.metrics.record_scrape(&outcome, elapsed);
            debug!(
                host = %host.address,
                metrics = outcome.batch.metrics.len(),
                read_failures = outcome.read_failures,
                duration_ms = elapsed * 1000.0,
                "Host scraped"
            );
            batches.push(outcome.batch);
        }

        self.metrics.cycles_total.inc();
        info!(
            hosts = batches.len(),
            metrics = batches.iter().map(|b| b.metrics.len()).sum::<usize>(),
            "Collection cycle complete"
        );
        batches
    }

    /// 호스트의 목록 캐시 참조 반환
    pub fn listing_cache(&self, host: &str) -> Option<&ListingCache> {
        self.caches.get(host)
    }

    /// 설정된 포매터 반환
    pub fn formatter(&self) -> &dyn MetricFormatter {
        self.formatter.as_ref()
    }
}
