// Vector index module
// Catalog/handle traits over the hosted Pinecone index and the local LanceDB store

pub mod lance;
pub mod pinecone;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::Result;
use crate::config::{Config, Credentials, IndexProvider, Metric};
use crate::embeddings::Embedder;

pub use lance::LanceCatalog;
pub use pinecone::PineconeCatalog;

/// FAQ pair stored alongside each vector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqMetadata {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// One record written by ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    /// `qa_<row index>`
    pub id: String,
    #[serde(rename = "values")]
    pub embedding: Vec<f32>,
    pub metadata: FaqMetadata,
}

/// One ranked hit from a similarity query, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: FaqMetadata,
}

/// Everything needed to create an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
}

/// Outcome of making sure an index exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

/// Index-level administration: listing, creating and opening indexes
#[async_trait]
pub trait IndexCatalog: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Create a new index. Callers check [`IndexCatalog::list_indexes`] first.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}

/// Handle to one existing index
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Vector length the index accepts, when the backend reports it
    fn dimension(&self) -> Option<usize>;

    /// Write all records in one bulk operation, overwriting by id
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Up to `top_k` nearest records with their metadata, best first
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;
}

/// Connect to the configured index provider
#[inline]
pub async fn connect(config: &Config, credentials: &Credentials) -> Result<Arc<dyn IndexCatalog>> {
    match config.index.provider {
        IndexProvider::Pinecone => {
            let catalog = PineconeCatalog::new(&config.index, credentials.pinecone_api_key()?)?;
            Ok(Arc::new(catalog))
        }
        IndexProvider::LanceDb => {
            let catalog =
                LanceCatalog::open(config.vector_database_path(), config.index.metric).await?;
            Ok(Arc::new(catalog))
        }
    }
}

/// Fail early when `embedder` produces vectors the index would reject
#[inline]
pub fn ensure_compatible(index: &dyn VectorIndex, embedder: &dyn Embedder) -> Result<()> {
    match index.dimension() {
        Some(expected) => check_dimension(index.name(), expected, embedder.dimension()),
        None => Ok(()),
    }
}

/// Reject vectors whose length differs from the index dimension
pub(crate) fn check_dimension(index: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(crate::FaqError::Index(format!(
            "Vector dimension {} does not match index {} dimension {}",
            actual, index, expected
        )))
    }
}
