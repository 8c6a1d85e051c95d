//! Embedding provider abstraction and the OpenAI implementation.
//!
//! Also carries the vector utilities shared by both index backends:
//! [`cosine_similarity`], plus [`vec_to_blob`]/[`blob_to_vec`] for storing
//! embeddings as little-endian f32 BLOBs in SQLite.
//!
//! The OpenAI provider makes a single attempt per call. An unreachable or
//! failing embedding backend makes retrieval (and ingestion) unavailable,
//! and that is surfaced as-is; nothing in the pipeline retries.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

/// Computes embedding vectors for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(Error::RetrievalUnavailable(
                "empty embedding response".into(),
            ));
        }
        Ok(vectors.swap_remove(0))
    }
}

/// Embedding provider backed by `POST /v1/embeddings` on the OpenAI API.
pub struct OpenAiEmbeddings {
    model: String,
    dims: usize,
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiEmbeddings {
    /// Build the provider from configuration. The API key is read from
    /// `OPENAI_API_KEY`; a missing key is fatal at startup.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: config.embedding_model.clone(),
            dims: config.embedding_dims,
            client,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, batch = texts.len(), "embedding batch");

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::RetrievalUnavailable(format!(
                "embedding API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            Error::RetrievalUnavailable(format!("invalid embedding response: {}", e))
        })?;

        parse_embeddings_response(&json)
    }
}

fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| {
            Error::RetrievalUnavailable("invalid embedding response: missing data array".into())
        })?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                Error::RetrievalUnavailable("invalid embedding response: missing embedding".into())
            })?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty or
/// mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
