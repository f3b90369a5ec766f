
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use super::{IndexCatalog, IndexSpec, QueryMatch, VectorIndex, VectorRecord, check_dimension};
use crate::config::IndexConfig;
use crate::http::{DEFAULT_TIMEOUT_SECONDS, build_agent, execute, execute_json};
use crate::{FaqError, Result};

const API_VERSION: &str = "2024-07";
const DEFAULT_READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Pinecone control plane: lists, creates and describes serverless indexes
#[derive(Debug, Clone)]
pub struct PineconeCatalog {
    controller_url: Url,
    api_key: String,
    agent: ureq::Agent,
    ready_poll_interval: Duration,
    ready_timeout: Duration,
}

/// Pinecone data plane for one index host
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    name: String,
    host: Url,
    dimension: Option<usize>,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    dimension: Option<usize>,
    #[serde(default)]
    host: String,
    status: Option<IndexState>,
}

#[derive(Debug, Deserialize)]
struct IndexState {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: &'a str,
    spec: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudRegion<'a>,
}

#[derive(Debug, Serialize)]
struct CloudRegion<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

fn index_error(e: anyhow::Error) -> FaqError {
    FaqError::Index(format!("{:#}", e))
}

impl PineconeCatalog {
    #[inline]
    pub fn new(config: &IndexConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            controller_url: config.controller_url()?,
            api_key: api_key.to_string(),
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            ready_poll_interval: DEFAULT_READY_POLL_INTERVAL,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// How often and how long `create_index` polls until the new index is ready
    #[inline]
    pub fn with_ready_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.ready_poll_interval = interval;
        self.ready_timeout = timeout;
        self
    }

    fn describe(&self, name: &str) -> anyhow::Result<IndexDescription> {
        let url = self
            .controller_url
            .join(&format!("/indexes/{}", name))
            .context("Failed to build describe index URL")?;

        execute_json("describe index", || {
            self.agent
                .get(url.as_str())
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .call()
        })
    }

    async fn wait_until_ready(&self, name: &str) -> anyhow::Result<()> {
        let started = Instant::now();
        loop {
            let description = self.describe(name)?;
            if description.status.as_ref().is_some_and(|s| s.ready) {
                debug!("Index {} is ready", name);
                return Ok(());
            }
            if started.elapsed() >= self.ready_timeout {
                anyhow::bail!(
                    "Index {} was not ready after {:?}",
                    name,
                    self.ready_timeout
                );
            }
            debug!("Index {} not ready yet, waiting", name);
            tokio::time::sleep(self.ready_poll_interval).await;
        }
    }
}

#[async_trait]
impl IndexCatalog for PineconeCatalog {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let url = self
            .controller_url
            .join("/indexes")
            .context("Failed to build list indexes URL")
            .map_err(index_error)?;

        let list: IndexList = execute_json("list indexes", || {
            self.agent
                .get(url.as_str())
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .call()
        })
        .map_err(index_error)?;

        debug!("Found {} Pinecone indexes", list.indexes.len());
        Ok(list.indexes.into_iter().map(|index| index.name).collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = self
            .controller_url
            .join("/indexes")
            .context("Failed to build create index URL")
            .map_err(index_error)?;

        let request_json = serde_json::to_string(&CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric.as_str(),
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        })
        .context("Failed to serialize create index request")
        .map_err(index_error)?;

        execute("create index", || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .send(&request_json)
        })
        .map_err(index_error)?;

        info!(
            "Created Pinecone index {} ({} dimensions, {} metric, {}/{})",
            spec.name, spec.dimension, spec.metric, spec.cloud, spec.region
        );

        self.wait_until_ready(&spec.name)
            .await
            .map_err(index_error)
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let description = self.describe(name).map_err(index_error)?;
        if description.host.is_empty() {
            return Err(FaqError::Index(format!("Index {} has no host yet", name)));
        }

        let host = if description.host.contains("://") {
            Url::parse(&description.host)
        } else {
            Url::parse(&format!("https://{}", description.host))
        }
        .map_err(|e| FaqError::Index(format!("Invalid host for index {}: {}", name, e)))?;

        debug!("Opened Pinecone index {} at {}", name, host);
        Ok(Arc::new(PineconeIndex {
            name: description.name,
            host,
            dimension: description.dimension,
            api_key: self.api_key.clone(),
            agent: self.agent.clone(),
        }))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            debug!("No vectors to upsert");
            return Ok(0);
        }

        if let Some(dimension) = self.dimension {
            for record in records {
                check_dimension(&self.name, dimension, record.embedding.len())?;
            }
        }

        let url = self
            .host
            .join("/vectors/upsert")
            .context("Failed to build upsert URL")
            .map_err(index_error)?;

        let request_json = serde_json::to_string(&UpsertRequest { vectors: records })
            .context("Failed to serialize upsert request")
            .map_err(index_error)?;

        let response: UpsertResponse = execute_json("upsert vectors", || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .send(&request_json)
        })
        .map_err(index_error)?;

        info!(
            "Upserted {} vectors into {}",
            response.upserted_count, self.name
        );
        Ok(response.upserted_count)
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        if let Some(dimension) = self.dimension {
            check_dimension(&self.name, dimension, embedding.len())?;
        }

        let url = self
            .host
            .join("/query")
            .context("Failed to build query URL")
            .map_err(index_error)?;

        let request_json = serde_json::to_string(&QueryRequest {
            vector: embedding,
            top_k,
            include_metadata: true,
            include_values: false,
        })
        .context("Failed to serialize query request")
        .map_err(index_error)?;

        let response: QueryResponse = execute_json("query index", || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .send(&request_json)
        })
        .map_err(index_error)?;

        debug!(
            "Query against {} returned {} matches",
            self.name,
            response.matches.len()
        );
        Ok(response.matches)
    }
}
