//! Two-tier parent/child retrieval.
//!
//! Small child chunks give precise similarity search; large parent chunks
//! give the model enough surrounding context to be useful. Ingestion
//! splits each source document into parent chunks, stores them in the
//! parent store, then splits each parent into embedded child chunks
//! tagged with the parent's identity. Queries match children, deduplicate
//! by parent identity in child-similarity order, and return the resolved
//! parent text.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::split_text;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::filter::MetadataFilter;
use crate::models::Document;
use crate::parent::ParentStore;
use crate::vector::{VectorIndex, VectorRecord};

/// Metadata key linking a child record to its parent chunk.
pub const PARENT_ID_KEY: &str = "parent_id";

pub struct ParentChildRetriever {
    collection: String,
    index: Arc<dyn VectorIndex>,
    parents: Arc<dyn ParentStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
}

impl ParentChildRetriever {
    pub fn new(
        collection: impl Into<String>,
        index: Arc<dyn VectorIndex>,
        parents: Arc<dyn ParentStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            collection: collection.into(),
            index,
            parents,
            embeddings,
            chunking,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingest source documents: parent-split, store parents, child-split,
    /// embed, and persist child vectors.
    ///
    /// Parent identities are fresh v4 UUIDs, so concurrent ingestion is
    /// append-only and collision-free.
    pub async fn add_documents(&self, sources: &[Document]) -> Result<()> {
        let mut child_texts: Vec<String> = Vec::new();
        let mut child_meta: Vec<serde_json::Value> = Vec::new();

        for source in sources {
            if !source.metadata.is_object() {
                return Err(Error::Validation(
                    "document metadata must be a JSON object".into(),
                ));
            }

            let parent_chunks = split_text(
                &source.content,
                self.chunking.parent_chunk_chars,
                0,
            );

            for parent_chunk in &parent_chunks {
                let parent_id = Uuid::new_v4().to_string();
                self.parents
                    .put(&self.collection, &parent_id, parent_chunk)
                    .await?;

                for child_chunk in split_text(
                    parent_chunk,
                    self.chunking.child_chunk_chars,
                    self.chunking.child_overlap_chars,
                ) {
                    let mut metadata = source.metadata.clone();
                    metadata[PARENT_ID_KEY] = serde_json::json!(parent_id);
                    child_texts.push(child_chunk);
                    child_meta.push(metadata);
                }
            }
        }

        if child_texts.is_empty() {
            return Ok(());
        }

        let vectors = self.embeddings.embed_batch(&child_texts).await?;
        if vectors.len() != child_texts.len() {
            return Err(Error::RetrievalUnavailable(format!(
                "embedding count mismatch: {} texts, {} vectors",
                child_texts.len(),
                vectors.len()
            )));
        }
        let dims = self.embeddings.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(Error::RetrievalUnavailable(format!(
                "embedding dimension mismatch: expected {}, got {}",
                dims,
                bad.len()
            )));
        }

        let records: Vec<VectorRecord> = child_texts
            .into_iter()
            .zip(child_meta)
            .zip(vectors)
            .map(|((content, metadata), embedding)| {
                let mut hasher = Sha256::new();
                hasher.update(content.as_bytes());
                VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    content_hash: format!("{:x}", hasher.finalize()),
                    content,
                    metadata,
                    embedding,
                }
            })
            .collect();

        debug!(
            collection = %self.collection,
            children = records.len(),
            "ingesting child records"
        );
        self.index.upsert(&self.collection, &records).await
    }

    /// Retrieve up to `parent_k` parent documents for a query.
    ///
    /// Fetches the top-`child_k` child matches (post-filter), keeps the
    /// first occurrence per parent identity in similarity order, cuts to
    /// `parent_k` distinct parents, and resolves each to its stored text.
    /// Children whose parent cannot be resolved are dropped with a
    /// warning; the result carries the metadata of the first matching
    /// child per parent.
    pub async fn retrieve(
        &self,
        query: &str,
        child_k: usize,
        parent_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        let query_vec = self.embeddings.embed_query(query).await?;
        let matches = self
            .index
            .query(&self.collection, &query_vec, child_k, filter)
            .await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut distinct: Vec<(String, serde_json::Value)> = Vec::new();
        for record in &matches {
            let Some(parent_id) = record
                .metadata
                .get(PARENT_ID_KEY)
                .and_then(|v| v.as_str())
            else {
                warn!(child = %record.id, "child record has no parent_id, dropping");
                continue;
            };
            if seen.insert(parent_id.to_string()) {
                distinct.push((parent_id.to_string(), record.metadata.clone()));
            }
        }
        distinct.truncate(parent_k);

        let mut documents = Vec::with_capacity(distinct.len());
        for (parent_id, metadata) in distinct {
            match self.parents.get(&self.collection, &parent_id).await? {
                Some(content) => documents.push(Document::new(content, metadata)),
                None => warn!(parent = %parent_id, "parent chunk not found, dropping"),
            }
        }

        debug!(
            collection = %self.collection,
            children = matches.len(),
            parents = documents.len(),
            "retrieval complete"
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parent::MemoryParentStore;
    use crate::vector::MemoryVectorIndex;
    use async_trait::async_trait;
    use serde_json::json;

    /// Deterministic embedder: one dimension per vocabulary word, valued
    /// by occurrence count.
    struct VocabEmbedder {
        vocab: Vec<&'static str>,
    }

    impl VocabEmbedder {
        fn new() -> Self {
            Self {
                vocab: vec!["alpha", "beta", "gamma"],
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for VocabEmbedder {
        fn dims(&self) -> usize {
            self.vocab.len()
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.vocab
                        .iter()
                        .map(|w| t.matches(w).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    fn retriever(chunking: ChunkingConfig) -> ParentChildRetriever {
        ParentChildRetriever::new(
            "jobs",
            Arc::new(MemoryVectorIndex::new()),
            Arc::new(MemoryParentStore::new()),
            Arc::new(VocabEmbedder::new()),
            chunking,
        )
    }

    fn small_chunking() -> ChunkingConfig {
        ChunkingConfig {
            parent_chunk_chars: 200,
            child_chunk_chars: 40,
            child_overlap_chars: 5,
        }
    }

    #[tokio::test]
    async fn returns_parent_content_not_child_text() {
        let r = retriever(small_chunking());
        let source = Document::new("alpha ".repeat(25), json!({ "jobid": 1 }));
        r.add_documents(&[source]).await.unwrap();

        let docs = r.retrieve("alpha", 10, 5, None).await.unwrap();
        assert!(!docs.is_empty());
        // 150 chars fits in one parent chunk; every result must be the
        // full parent, never a 40-char child window.
        assert_eq!(docs[0].content, "alpha ".repeat(25));
    }

    #[tokio::test]
    async fn deduplicates_children_by_parent() {
        let r = retriever(small_chunking());
        // One parent, several children all matching the query.
        r.add_documents(&[Document::new("alpha ".repeat(25), json!({}))])
            .await
            .unwrap();

        let docs = r.retrieve("alpha", 50, 10, None).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn caps_results_at_parent_k() {
        let r = retriever(small_chunking());
        let sources: Vec<Document> = (0..4)
            .map(|i| Document::new(format!("alpha document {}", i), json!({ "jobid": i })))
            .collect();
        r.add_documents(&sources).await.unwrap();

        let docs = r.retrieve("alpha", 50, 2, None).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn best_matching_parent_comes_first() {
        let r = retriever(small_chunking());
        r.add_documents(&[
            Document::new("alpha alpha alpha", json!({ "jobid": "a" })),
            Document::new("beta beta beta", json!({ "jobid": "b" })),
        ])
        .await
        .unwrap();

        let docs = r.retrieve("beta", 10, 5, None).await.unwrap();
        assert_eq!(docs[0].metadata["jobid"], json!("b"));
    }

    #[tokio::test]
    async fn filter_restricts_candidates() {
        let r = retriever(small_chunking());
        r.add_documents(&[
            Document::new("alpha job one", json!({ "geocode": { "countryCode": "US" } })),
            Document::new("alpha job two", json!({ "geocode": { "countryCode": "DE" } })),
        ])
        .await
        .unwrap();

        let filter = MetadataFilter::is_in("geocode.countryCode", vec![json!("US")]);
        let docs = r.retrieve("alpha", 10, 5, Some(&filter)).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata["geocode"]["countryCode"], json!("US"));
    }

    #[tokio::test]
    async fn missing_parents_are_silently_dropped() {
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(VocabEmbedder::new());

        let ingest = ParentChildRetriever::new(
            "jobs",
            index.clone(),
            Arc::new(MemoryParentStore::new()),
            embedder.clone(),
            small_chunking(),
        );
        ingest
            .add_documents(&[Document::new("alpha text", json!({}))])
            .await
            .unwrap();

        // Same durable index, fresh (empty) parent store: the restart
        // scenario an ephemeral parent store produces.
        let query = ParentChildRetriever::new(
            "jobs",
            index,
            Arc::new(MemoryParentStore::new()),
            embedder,
            small_chunking(),
        );
        let docs = query.retrieve("alpha", 10, 5, None).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn long_document_splits_into_two_parents_and_query_hits_first() {
        let chunking = ChunkingConfig {
            parent_chunk_chars: 10_000,
            child_chunk_chars: 250,
            child_overlap_chars: 20,
        };
        let r = retriever(chunking.clone());

        let text = format!("{}{}", "alpha ".repeat(1666), "beta ".repeat(500));
        assert!(text.len() > 12_000);

        let expected_parents = split_text(&text, chunking.parent_chunk_chars, 0);
        assert_eq!(expected_parents.len(), 2);

        r.add_documents(&[Document::new(text, json!({ "jobid": 9 }))])
            .await
            .unwrap();

        let docs = r.retrieve("alpha", 5, 1, None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, expected_parents[0]);
    }

    /// Claims one dimensionality but produces another.
    struct LyingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LyingEmbedder {
        fn dims(&self) -> usize {
            8
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn rejects_vectors_with_wrong_dimensionality() {
        let r = ParentChildRetriever::new(
            "jobs",
            Arc::new(MemoryVectorIndex::new()),
            Arc::new(MemoryParentStore::new()),
            Arc::new(LyingEmbedder),
            small_chunking(),
        );
        let err = r
            .add_documents(&[Document::new("alpha text", json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn rejects_non_object_metadata() {
        let r = retriever(small_chunking());
        let err = r
            .add_documents(&[Document::new("text", json!("not an object"))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
