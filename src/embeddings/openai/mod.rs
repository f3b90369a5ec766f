
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::http::{DEFAULT_TIMEOUT_SECONDS, build_agent, execute_json};
use crate::{FaqError, Result};

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    base_url: Url,
    model: String,
    dimension: usize,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    #[inline]
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let base_url = config.url()?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.dimension as usize,
            api_key: api_key.into(),
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_embedding(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let url = self
            .base_url
            .join("/v1/embeddings")
            .context("Failed to build embedding URL")?;

        let request_json = serde_json::to_string(&EmbedRequest {
            model: &self.model,
            input: [text],
        })
        .context("Failed to serialize embedding request")?;

        let response: EmbedResponse = execute_json("embedding request", || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", &format!("Bearer {}", self.api_key))
                .send(&request_json)
        })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .context("Embedding response contained no data")?;

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimension
            );
        }

        Ok(embedding)
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let embedding = self
            .request_embedding(text)
            .map_err(|e| FaqError::Embedding(format!("{:#}", e)))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
