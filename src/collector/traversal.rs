//! Per-host traversal
//!
//! One host, one cycle: list → filter domains → read → walk. Listing must
//! finish (and update the host's cache) before any read starts. Nothing is
//! retried; a failed call only loses its own unit of work.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::cache::ListingCache;
use super::client::BridgeClient;
use super::filter::BeanFilters;
use super::parser::{attribute_map, BeanIdentity};
use crate::discovery::Host;
use crate::formatter::{BeanContext, MetricFormatter, MetricSink};
use crate::transformer::{Dimensions, HostBatch, NameSanitizer};

/// Result of scraping one host
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    /// Published metrics
    pub batch: HostBatch,
    /// Whether the listing request returned a usable response
    pub listing_ok: bool,
    /// Read or scoped-listing calls that yielded no data
    pub read_failures: u64,
    /// Metrics dropped by rewrites
    pub dropped: u64,
}

/// Traversal of one host for one cycle
pub struct HostScrape<'a> {
    client: &'a BridgeClient,
    filters: &'a BeanFilters,
    formatter: &'a dyn MetricFormatter,
    sanitizer: &'a NameSanitizer,
    host: &'a Host,
    host_dimensions: &'a Dimensions,
    sink: MetricSink,
    read_failures: u64,
}

impl<'a> HostScrape<'a> {
    pub fn new(
        client: &'a BridgeClient,
        filters: &'a BeanFilters,
        formatter: &'a dyn MetricFormatter,
        sanitizer: &'a NameSanitizer,
        host: &'a Host,
        host_dimensions: &'a Dimensions,
    ) -> Self {
        Self {
            client,
            filters,
            formatter,
            sanitizer,
            host,
            host_dimensions,
            sink: MetricSink::default(),
            read_failures: 0,
        }
    }

    /// Run the whole state machine against `cache`
    ///
    /// A transport failure on the listing aborts the host for this cycle. A
    /// non-200 listing keeps the cached domains and reads them.
    pub async fn run(mut self, cache: &mut ListingCache) -> ScrapeOutcome {
        let host = self.host;

        match self.client.list(&host.address, cache.cursor()).await {
            Ok(response) => {
                if !cache.apply(&response) {
                    debug!(host = %host.address, status = response.status, "Using cached domain listing");
                }
            }
            Err(e) => {
                error!(host = %host.address, error = %e, "Unable to retrieve bean listing");
                return self.finish(false);
            }
        }

        for domain in cache.domain_keys() {
            if self.filters.is_domain_ignored(domain) {
                continue;
            }
            if self.filters.needs_scoped_listing(domain) {
                self.read_except_blacklist(domain).await;
            } else {
                self.read_domain(domain).await;
            }
        }

        self.finish(true)
    }

    fn finish(self, listing_ok: bool) -> ScrapeOutcome {
        ScrapeOutcome {
            batch: HostBatch {
                host: self.host.address.clone(),
                metrics: self.sink.metrics,
            },
            listing_ok,
            read_failures: self.read_failures,
            dropped: self.sink.dropped,
        }
    }

    /// Read every bean of `domain` in one request
    async fn read_domain(&mut self, domain: &str) {
        let host = self.host;
        let address = host.address.as_str();
        let beans = match self.client.read(address, domain, false).await {
            Ok(response) => response.into_object(),
            Err(e) => {
                warn!(host = %address, domain = %domain, error = %e, "Domain read failed");
                None
            }
        };

        let Some(beans) = beans else {
            self.read_failures += 1;
            return;
        };

        for (bean, attributes) in beans {
            if !self.filters.includes(&bean, self.sanitizer) {
                continue;
            }
            self.collect(&bean, attributes);
        }
    }

    /// List the beans of a blacklisted domain and read the others one by one
    async fn read_except_blacklist(&mut self, domain: &str) {
        let host = self.host;
        let address = host.address.as_str();
        let keys = match self.client.list_scoped(address, domain).await {
            Ok(response) => response.into_object(),
            Err(e) => {
                warn!(host = %address, domain = %domain, error = %e, "Scoped listing failed");
                None
            }
        };

        let Some(keys) = keys else {
            error!(host = %address, domain = %domain, "Unable to retrieve bean listing");
            self.read_failures += 1;
            return;
        };

        for key in keys.keys() {
            let bean = format!("{}:{}", domain, key);
            if self.filters.is_blacklisted(&bean) {
                debug!(bean = %bean, "Skipping blacklisted bean");
                continue;
            }
            if !self.filters.includes(&bean, self.sanitizer) {
                continue;
            }
            self.read_bean(&bean).await;
        }
    }

    async fn read_bean(&mut self, bean: &str) {
        let host = self.host;
        let address = host.address.as_str();
        match self.client.read(address, bean, true).await {
            Ok(response) => match response.into_object() {
                Some(attributes) => self.collect(bean, Value::Object(attributes)),
                None => self.read_failures += 1,
            },
            Err(e) => {
                warn!(host = %address, bean = %bean, error = %e, "Bean read failed");
                self.read_failures += 1;
            }
        }
    }

    /// Hand one bean's attribute tree to the formatter
    fn collect(&mut self, bean: &str, attributes: Value) {
        let Value::Object(attributes) = attributes else {
            debug!(bean = %bean, "Bean value is not an attribute map");
            return;
        };

        let identity = match BeanIdentity::parse(bean) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Skipping bean");
                return;
            }
        };

        let ctx = BeanContext {
            identity: &identity,
            host: self.host,
            host_dimensions: self.host_dimensions,
            sanitizer: self.sanitizer,
        };
        self.formatter
            .collect_bean(&ctx, "", &attribute_map(attributes), &mut self.sink);
    }
}
