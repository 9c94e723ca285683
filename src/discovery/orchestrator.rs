//! Orchestrator node agent client
//!
//! Lists the processes (pods) scheduled on the local node through the node
//! agent's `/pods` endpoint.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::collector::CollectResult;
use crate::config::OrchestratorConfig;
use crate::error::CollectorError;

/// A process reported by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Process IP, absent while the process is being scheduled
    pub ip: Option<String>,
    /// Process labels
    pub labels: BTreeMap<String, String>,
}

/// Source of process records
///
/// A failure means "no information this cycle"; callers never abort on it.
#[async_trait]
pub trait ProcessSource: Send + Sync {
    /// List every process known to the orchestrator on this node
    async fn list_processes(&self) -> CollectResult<Vec<ProcessRecord>>;
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    #[serde(default)]
    metadata: PodMetadata,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Default, Deserialize)]
struct PodMetadata {
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Default, Deserialize)]
struct PodStatus {
    #[serde(rename = "podIP", default)]
    pod_ip: Option<String>,
}

/// Parse a node agent `/pods` body
pub fn parse_pod_list(body: &str) -> CollectResult<Vec<ProcessRecord>> {
    let pods: PodList =
        serde_json::from_str(body).map_err(|e| CollectorError::JsonParse(e.to_string()))?;

    Ok(pods
        .items
        .into_iter()
        .map(|pod| ProcessRecord {
            ip: pod.status.pod_ip,
            labels: pod.metadata.labels.unwrap_or_default(),
        })
        .collect())
}

/// HTTP client for the kubelet read-only API
#[derive(Clone)]
pub struct KubeletClient {
    client: Client,
    url: String,
}

impl KubeletClient {
    /// Create a client for `http://{host}:{port}/pods`
    pub fn new(config: &OrchestratorConfig) -> CollectResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        Ok(Self {
            client,
            url: format!("http://{}:{}/pods", config.host, config.port),
        })
    }

    /// The pods endpoint this client queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProcessSource for KubeletClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn list_processes(&self) -> CollectResult<Vec<ProcessRecord>> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(CollectorError::HttpResponse)?;

        let processes = parse_pod_list(&body)?;
        debug!(count = processes.len(), "Listed processes");
        Ok(processes)
    }
}
