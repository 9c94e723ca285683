//! Internal observability metrics for rJMX-Collector
//!
//! Metrics about the collector's own operation, appended to every exposition.
//!
//! # Metrics
//!
//! ## Per-host metrics
//! - `rjmx_listing_success_total{host="..."}` - Counter of usable listing responses
//! - `rjmx_listing_failure_total{host="..."}` - Counter of failed listing requests
//! - `rjmx_read_failure_total{host="..."}` - Counter of reads that yielded no data
//! - `rjmx_scrape_duration_seconds{host="..."}` - Histogram of per-host scrape durations
//!
//! ## Cycle metrics
//! - `rjmx_metrics_dropped_total` - Counter of metrics whose name was rewritten to empty
//! - `rjmx_hosts_discovered` - Gauge of hosts returned by the last host read
//! - `rjmx_cycles_total` - Counter of completed collection cycles

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::collector::ScrapeOutcome;
use crate::transformer::{MetricType, PrometheusExposition, PrometheusSample};

/// Default histogram buckets for scrape duration (in seconds)
pub const DEFAULT_HISTOGRAM_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe gauge using atomic operations
#[derive(Debug, Default)]
pub struct Gauge {
    /// Stored as bits of f64 for atomic operations
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }
}

/// Thread-safe histogram for measuring distributions
#[derive(Debug)]
pub struct Histogram {
    /// Bucket boundaries (upper bounds)
    buckets: Vec<f64>,
    /// Cumulative bucket counters
    bucket_counts: Vec<AtomicU64>,
    /// Sum of all observed values, as f64 bits
    sum: AtomicU64,
    /// Total count of observations
    count: AtomicU64,
}

impl Histogram {
    /// Create a histogram with the given bucket boundaries
    pub fn new(buckets: &[f64]) -> Self {
        let mut sorted_buckets: Vec<f64> = buckets.to_vec();
        sorted_buckets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // +Inf bucket
        if sorted_buckets
            .last()
            .map(|v| !v.is_infinite())
            .unwrap_or(true)
        {
            sorted_buckets.push(f64::INFINITY);
        }

        let bucket_counts = (0..sorted_buckets.len())
            .map(|_| AtomicU64::new(0))
            .collect();

        Self {
            buckets: sorted_buckets,
            bucket_counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    pub fn with_default_buckets() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BUCKETS)
    }

    /// Observe a value
    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        loop {
            let current = self.sum.load(Ordering::Relaxed);
            let new = f64::from_bits(current) + v;
            if self
                .sum
                .compare_exchange_weak(current, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        for (i, &bound) in self.buckets.iter().enumerate() {
            if v <= bound {
                self.bucket_counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get_sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Bucket boundaries with their cumulative counts
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(self.bucket_counts.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_default_buckets()
    }
}

/// Per-host metrics
#[derive(Debug, Default)]
pub struct HostMetrics {
    pub listing_success_total: Counter,
    pub listing_failure_total: Counter,
    pub read_failure_total: Counter,
    pub scrape_duration_seconds: Histogram,
}

/// Internal metrics registry
///
/// Shared between the collector, which records, and the HTTP surface, which
/// renders.
#[derive(Debug, Default)]
pub struct CollectorMetrics {
    /// Per-host metrics, keyed by bridge address
    hosts: RwLock<HashMap<String, Arc<HostMetrics>>>,
    /// Metrics dropped by rewrites
    pub dropped_total: Counter,
    /// Hosts returned by the last host read
    pub hosts_discovered: Gauge,
    /// Completed collection cycles
    pub cycles_total: Counter,
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create metrics for a host
    pub fn host(&self, host: &str) -> Arc<HostMetrics> {
        if let Ok(hosts) = self.hosts.read() {
            if let Some(metrics) = hosts.get(host) {
                return metrics.clone();
            }
        }

        match self.hosts.write() {
            Ok(mut hosts) => hosts.entry(host.to_string()).or_default().clone(),
            Err(poisoned) => poisoned
                .into_inner()
                .entry(host.to_string())
                .or_default()
                .clone(),
        }
    }

    /// Drop metrics of hosts not in `current`
    pub fn retain_hosts(&self, current: &HashSet<&str>) {
        let mut hosts = match self.hosts.write() {
            Ok(hosts) => hosts,
            Err(poisoned) => poisoned.into_inner(),
        };
        hosts.retain(|address, _| current.contains(address.as_str()));
    }

    /// Record the outcome of one host scrape
    pub fn record_scrape(&self, outcome: &ScrapeOutcome, duration_seconds: f64) {
        let metrics = self.host(&outcome.batch.host);
        if outcome.listing_ok {
            metrics.listing_success_total.inc();
        } else {
            metrics.listing_failure_total.inc();
        }
        metrics.read_failure_total.inc_by(outcome.read_failures);
        metrics.scrape_duration_seconds.observe(duration_seconds);
        self.dropped_total.inc_by(outcome.dropped);
    }

    fn host_snapshot(&self) -> Vec<(String, Arc<HostMetrics>)> {
        let mut hosts: Vec<(String, Arc<HostMetrics>)> = match self.hosts.read() {
            Ok(hosts) => hosts.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        hosts.sort_by(|a, b| a.0.cmp(&b.0));
        hosts
    }

    /// Internal metrics as Prometheus samples
    pub fn to_samples(&self) -> Vec<PrometheusSample> {
        let mut samples = Vec::new();

        for (host, metrics) in self.host_snapshot() {
            samples.push(
                PrometheusSample::new(
                    "rjmx_listing_success_total",
                    metrics.listing_success_total.get() as f64,
                )
                .with_type(MetricType::Counter)
                .with_help("Total number of usable listing responses")
                .with_label("host", &host),
            );
            samples.push(
                PrometheusSample::new(
                    "rjmx_listing_failure_total",
                    metrics.listing_failure_total.get() as f64,
                )
                .with_type(MetricType::Counter)
                .with_help("Total number of failed listing requests")
                .with_label("host", &host),
            );
            samples.push(
                PrometheusSample::new(
                    "rjmx_read_failure_total",
                    metrics.read_failure_total.get() as f64,
                )
                .with_type(MetricType::Counter)
                .with_help("Total number of reads that yielded no data")
                .with_label("host", &host),
            );

            let histogram = &metrics.scrape_duration_seconds;
            for (bound, count) in histogram.get_buckets() {
                let le = if bound.is_infinite() {
                    "+Inf".to_string()
                } else {
                    format!("{}", bound)
                };
                samples.push(
                    PrometheusSample::new("rjmx_scrape_duration_seconds_bucket", count as f64)
                        .with_help("Histogram of per-host scrape durations")
                        .with_label("host", &host)
                        .with_label("le", le),
                );
            }
            samples.push(
                PrometheusSample::new("rjmx_scrape_duration_seconds_sum", histogram.get_sum())
                    .with_help("Total sum of per-host scrape durations")
                    .with_label("host", &host),
            );
            samples.push(
                PrometheusSample::new(
                    "rjmx_scrape_duration_seconds_count",
                    histogram.get_count() as f64,
                )
                .with_help("Total count of per-host scrapes")
                .with_label("host", &host),
            );
        }

        samples.push(
            PrometheusSample::new("rjmx_metrics_dropped_total", self.dropped_total.get() as f64)
                .with_type(MetricType::Counter)
                .with_help("Total number of metrics whose name was rewritten to empty"),
        );
        samples.push(
            PrometheusSample::new("rjmx_hosts_discovered", self.hosts_discovered.get())
                .with_help("Number of hosts returned by the last host read"),
        );
        samples.push(
            PrometheusSample::new("rjmx_cycles_total", self.cycles_total.get() as f64)
                .with_type(MetricType::Counter)
                .with_help("Total number of completed collection cycles"),
        );

        samples
    }

    /// Internal metrics in Prometheus exposition format
    pub fn format_prometheus(&self) -> String {
        PrometheusExposition::new().format(&self.to_samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::HostBatch;

    fn outcome(host: &str, listing_ok: bool, read_failures: u64, dropped: u64) -> ScrapeOutcome {
        ScrapeOutcome {
            batch: HostBatch {
                host: host.to_string(),
                metrics: vec![],
            },
            listing_ok,
            read_failures,
            dropped,
        }
    }

    #[test]
    fn test_counter_operations() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);
        counter.inc();
        counter.inc_by(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_gauge_operations() {
        let gauge = Gauge::new();
        assert_eq!(gauge.get(), 0.0);
        gauge.set(42.5);
        assert_eq!(gauge.get(), 42.5);
    }

    #[test]
    fn test_histogram_operations() {
        let histogram = Histogram::new(&[0.1, 0.5, 1.0]);

        histogram.observe(0.05);
        histogram.observe(0.3);
        histogram.observe(0.8);
        histogram.observe(2.0);

        assert_eq!(histogram.get_count(), 4);

        let buckets = histogram.get_buckets();
        assert_eq!(buckets[0], (0.1, 1));
        assert_eq!(buckets[1], (0.5, 2));
        assert_eq!(buckets[2], (1.0, 3));
        assert_eq!(buckets[3].1, 4);
    }

    #[test]
    fn test_histogram_default_buckets() {
        let histogram = Histogram::with_default_buckets();
        assert_eq!(histogram.get_buckets().len(), DEFAULT_HISTOGRAM_BUCKETS.len() + 1);
    }

    #[test]
    fn test_record_scrape() {
        let metrics = CollectorMetrics::new();

        metrics.record_scrape(&outcome("10.0.0.1", true, 2, 1), 0.05);
        metrics.record_scrape(&outcome("10.0.0.1", false, 0, 0), 0.10);
        metrics.record_scrape(&outcome("10.0.0.2", true, 0, 3), 0.20);

        let host = metrics.host("10.0.0.1");
        assert_eq!(host.listing_success_total.get(), 1);
        assert_eq!(host.listing_failure_total.get(), 1);
        assert_eq!(host.read_failure_total.get(), 2);
        assert_eq!(host.scrape_duration_seconds.get_count(), 2);
        assert_eq!(metrics.dropped_total.get(), 4);
    }

    #[test]
    fn test_retain_hosts() {
        let metrics = CollectorMetrics::new();
        metrics.record_scrape(&outcome("10.0.0.1", true, 0, 0), 0.05);
        metrics.record_scrape(&outcome("10.0.0.2", false, 0, 0), 0.05);

        metrics.retain_hosts(&HashSet::from(["10.0.0.2"]));

        let samples = metrics.to_samples();
        let hosts: Vec<&str> = samples
            .iter()
            .filter_map(|s| s.labels.get("host").map(String::as_str))
            .collect();
        assert!(!hosts.is_empty());
        assert!(hosts.iter().all(|h| *h == "10.0.0.2"));
    }

    #[test]
    fn test_to_samples() {
        let metrics = CollectorMetrics::new();
        metrics.record_scrape(&outcome("10.0.0.1", true, 0, 0), 0.1);
        metrics.hosts_discovered.set(1.0);

        let samples = metrics.to_samples();
        let names: Vec<&str> = samples.iter().map(|s| s.name.as_str()).collect();

        assert!(names.contains(&"rjmx_listing_success_total"));
        assert!(names.contains(&"rjmx_listing_failure_total"));
        assert!(names.contains(&"rjmx_read_failure_total"));
        assert!(names.contains(&"rjmx_scrape_duration_seconds_bucket"));
        assert!(names.contains(&"rjmx_scrape_duration_seconds_sum"));
        assert!(names.contains(&"rjmx_scrape_duration_seconds_count"));
        assert!(names.contains(&"rjmx_metrics_dropped_total"));
        assert!(names.contains(&"rjmx_hosts_discovered"));
        assert!(names.contains(&"rjmx_cycles_total"));
    }

    #[test]
    fn test_format_prometheus() {
        let metrics = CollectorMetrics::new();
        metrics.record_scrape(&outcome("localhost", true, 0, 0), 0.05);

        let output = metrics.format_prometheus();
        assert!(output.contains("rjmx_listing_success_total{host=\"localhost\"} 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE rjmx_hosts_discovered gauge"));
    }
}
