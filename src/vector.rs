//! Vector index abstraction with SQLite and in-memory backends.
//!
//! Records are keyed per logical collection (`documents` for resumes,
//! `jobs` for postings). Similarity search is brute-force cosine over the
//! collection, computed in Rust; structured metadata filters are applied
//! before the top-k cut so filtered-out candidates never consume slots.
//!
//! Any backend failure is reported as [`Error::RetrievalUnavailable`] and
//! must reach the orchestrator without a silent retry.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::filter::MetadataFilter;

/// Collection name for resume document chunks.
pub const COLLECTION_DOCUMENTS: &str = "documents";
/// Collection name for job posting chunks.
pub const COLLECTION_JOBS: &str = "jobs";

/// A child record to persist in the index.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub embedding: Vec<f32>,
    pub content_hash: String,
}

/// A ranked match returned from a query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub score: f64,
}

/// Abstract vector index keyed by collection.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records in a collection.
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()>;

    /// Return the top-`k` records by cosine similarity to `vector`,
    /// restricted to those matching `filter`.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>>;
}

fn rank_candidates(mut candidates: Vec<ScoredRecord>, k: usize) -> Vec<ScoredRecord> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(k);
    candidates
}

// ============ SQLite backend ============

/// Durable vector index stored in the `vectors` table.
pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Persistence(format!("vector upsert begin: {}", e)))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO vectors (id, collection, content, metadata_json, embedding, content_hash)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    collection = excluded.collection,
                    content = excluded.content,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    content_hash = excluded.content_hash
                "#,
            )
            .bind(&record.id)
            .bind(collection)
            .bind(&record.content)
            .bind(record.metadata.to_string())
            .bind(vec_to_blob(&record.embedding))
            .bind(&record.content_hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Persistence(format!("vector upsert: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Persistence(format!("vector upsert commit: {}", e)))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>> {
        let rows = sqlx::query(
            "SELECT id, content, metadata_json, embedding FROM vectors WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::RetrievalUnavailable(format!("vector query on '{}': {}", collection, e))
        })?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let metadata_json: String = row.get("metadata_json");
            let metadata: serde_json::Value =
                serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({}));

            if let Some(f) = filter {
                if !f.matches(&metadata) {
                    continue;
                }
            }

            let blob: Vec<u8> = row.get("embedding");
            let score = cosine_similarity(vector, &blob_to_vec(&blob)) as f64;
            candidates.push(ScoredRecord {
                id: row.get("id"),
                content: row.get("content"),
                metadata,
                score,
            });
        }

        debug!(collection, candidates = candidates.len(), k, "vector query");
        Ok(rank_candidates(candidates, k))
    }
}

// ============ In-memory backend ============

/// In-memory vector index for tests and ephemeral sessions.
pub struct MemoryVectorIndex {
    collections: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let stored = collections.entry(collection.to_string()).or_default();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>> {
        let collections = self.collections.read().unwrap();
        let records = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);

        let candidates = records
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| ScoredRecord {
                id: r.id.clone(),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                score: cosine_similarity(vector, &r.embedding) as f64,
            })
            .collect();

        Ok(rank_candidates(candidates, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, embedding: Vec<f32>, metadata: serde_json::Value) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            content: format!("content of {}", id),
            metadata,
            embedding,
            content_hash: String::new(),
        }
    }

    #[tokio::test]
    async fn memory_index_ranks_by_similarity() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                COLLECTION_JOBS,
                &[
                    record("far", vec![0.0, 1.0], json!({})),
                    record("near", vec![1.0, 0.0], json!({})),
                    record("mid", vec![1.0, 1.0], json!({})),
                ],
            )
            .await
            .unwrap();

        let results = index
            .query(COLLECTION_JOBS, &[1.0, 0.0], 2, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "near");
        assert_eq!(results[1].id, "mid");
    }

    #[tokio::test]
    async fn filter_applies_before_top_k_cut() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                COLLECTION_JOBS,
                &[
                    record("us-1", vec![1.0, 0.0], json!({ "geocode": { "countryCode": "US" } })),
                    record("de-1", vec![1.0, 0.0], json!({ "geocode": { "countryCode": "DE" } })),
                    record("us-2", vec![0.9, 0.1], json!({ "geocode": { "countryCode": "US" } })),
                ],
            )
            .await
            .unwrap();

        let filter = MetadataFilter::is_in("geocode.countryCode", vec![json!("US")]);
        let results = index
            .query(COLLECTION_JOBS, &[1.0, 0.0], 2, Some(&filter))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.id.starts_with("us-")));
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(COLLECTION_DOCUMENTS, &[record("resume", vec![1.0], json!({}))])
            .await
            .unwrap();

        let results = index.query(COLLECTION_JOBS, &[1.0], 10, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(COLLECTION_JOBS, &[record("a", vec![1.0, 0.0], json!({}))])
            .await
            .unwrap();
        index
            .upsert(COLLECTION_JOBS, &[record("a", vec![0.0, 1.0], json!({}))])
            .await
            .unwrap();

        let results = index.query(COLLECTION_JOBS, &[0.0, 1.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }
}
