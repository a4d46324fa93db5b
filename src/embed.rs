//! The embedding collaborator boundary.
//!
//! The store treats vectors as opaque; everything about how text becomes
//! a vector lives behind the [`Embedder`] trait. Two implementations:
//! an HTTP client for an OpenAI-style `/embeddings` endpoint, and a
//! deterministic hashing embedder for offline runs and tests.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::error::{DealflowError, Result};

/// Produces a vector for a piece of text. Stateless; each call is
/// independent.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Configuration for the HTTP embedder.
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// OpenAI-style embeddings API client.
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_key: String,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    /// Reads OPENAI_API_KEY from the environment.
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| DealflowError::Config("OPENAI_API_KEY not set".to_string()))?;
        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: String, config: HttpEmbedderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DealflowError::collaborator("embedding", format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, api_key, config })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.config.model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DealflowError::collaborator("embedding", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DealflowError::collaborator(
                "embedding",
                format!("API error {status}: {message}"),
            ));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DealflowError::collaborator("embedding", e.to_string()))?;

        let vector = parsed["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| DealflowError::MalformedResponse("embeddings response missing data[0].embedding".to_string()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect::<Vec<f32>>();

        if vector.is_empty() {
            return Err(DealflowError::MalformedResponse("empty embedding vector".to_string()));
        }
        Ok(vector)
    }
}

/// Dimensionality of the hashing embedder.
pub const HASH_EMBEDDER_DIM: usize = 256;

/// Deterministic local embedder: character-bigram counts hashed into a
/// fixed number of buckets, L2-normalized. No notion of semantics, but
/// stable, dependency-free, and close enough for spelling-variant
/// similarity — which is all the dedup path needs offline.
#[derive(Debug, Clone, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn bucket(a: char, b: char) -> usize {
        // FNV-1a over the two chars
        let mut hash: u64 = 0xcbf29ce484222325;
        for unit in [a as u32, b as u32] {
            for byte in unit.to_le_bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
        }
        (hash % HASH_EMBEDDER_DIM as u64) as usize
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; HASH_EMBEDDER_DIM];
        let folded: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        for pair in folded.windows(2) {
            vector[Self::bucket(pair[0], pair[1])] += 1.0;
        }
        if folded.len() == 1 {
            vector[Self::bucket(folded[0], folded[0])] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
