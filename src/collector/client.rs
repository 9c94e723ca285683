//! JMX bridge HTTP client
//!
//! Async HTTP client with connection pooling and timeouts for the bridge's
//! listing and read endpoints.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument};

use super::parser::{parse_response, BridgeResponse, CollectResult};
use crate::config::BridgeConfig;
use crate::error::CollectorError;

/// Escape a domain or bean path for the `p=` query parameter
///
/// `!`, `/` and `"` are escaped with `!` first, then the result is
/// percent-encoded with `/` kept literal. Only `A-Z a-z 0-9 - _ . ~` and `/`
/// pass through unencoded.
pub fn escape_domain(domain: &str) -> String {
    let escaped = domain
        .replace('!', "!!")
        .replace('/', "!/")
        .replace('"', "!\"");
    urlencoding::encode(&escaped).replace("%2F", "/")
}

/// JMX bridge HTTP client
#[derive(Clone)]
pub struct BridgeClient {
    client: Client,
    port: u16,
    url_path: String,
    listing_max_depth: u32,
    read_limit: u32,
}

impl BridgeClient {
    /// Create a new client
    ///
    /// # Example
    /// ```ignore
    /// let client = BridgeClient::new(&BridgeConfig::default())?;
    /// let listing = client.list("10.0.0.1", 0).await?;
    /// ```
    pub fn new(config: &BridgeConfig) -> CollectResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        Ok(Self {
            client,
            port: config.port,
            url_path: config.url_path.trim_matches('/').to_string(),
            listing_max_depth: config.listing_max_depth,
            read_limit: config.read_limit,
        })
    }

    fn base_url(&self, host: &str) -> String {
        format!("http://{}:{}/{}", host, self.port, self.url_path)
    }

    /// Full listing URL for changes since `cursor`
    pub fn list_url(&self, host: &str, cursor: i64) -> String {
        format!(
            "{}/list?ifModifiedSince={}&maxDepth={}",
            self.base_url(host),
            cursor,
            self.listing_max_depth
        )
    }

    /// Listing URL scoped to one domain
    pub fn scoped_list_url(&self, host: &str, domain: &str) -> String {
        format!(
            "{}/list/{}?maxDepth={}",
            self.base_url(host),
            domain,
            self.listing_max_depth
        )
    }

    /// Read URL for a whole domain (`path:*`) or one bean
    pub fn read_url(&self, host: &str, path: &str, single_bean: bool) -> String {
        let mut url = format!(
            "{}/?ignoreErrors=true&includeStackTrace=false&maxCollectionSize={}&p=read/{}",
            self.base_url(host),
            self.read_limit,
            escape_domain(path)
        );
        if !single_bean {
            url.push_str(":*");
        }
        url
    }

    /// Full domain listing
    #[instrument(skip(self))]
    pub async fn list(&self, host: &str, cursor: i64) -> CollectResult<BridgeResponse> {
        self.fetch(&self.list_url(host, cursor)).await
    }

    /// Bean listing under one domain
    #[instrument(skip(self))]
    pub async fn list_scoped(&self, host: &str, domain: &str) -> CollectResult<BridgeResponse> {
        self.fetch(&self.scoped_list_url(host, domain)).await
    }

    /// Read every bean of a domain, or a single bean
    #[instrument(skip(self))]
    pub async fn read(
        &self,
        host: &str,
        path: &str,
        single_bean: bool,
    ) -> CollectResult<BridgeResponse> {
        self.fetch(&self.read_url(host, path, single_bean)).await
    }

    async fn fetch(&self, url: &str) -> CollectResult<BridgeResponse> {
        debug!(url = %url, "Sending bridge request");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(CollectorError::HttpResponse)?;

        parse_response(&body)
    }
}
