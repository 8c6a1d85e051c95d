//! Parent chunk storage.
//!
//! Child vectors only carry a `parent_id`; the parent text they expand to
//! lives here. The SQLite store is the default so parent chunks survive
//! process restarts alongside the child vectors — an ephemeral parent
//! store would silently orphan every persisted child after a restart.
//! [`MemoryParentStore`] keeps that ephemeral behavior available as an
//! explicit choice for tests and single-session caching.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};

/// Identity-keyed storage for parent chunk text, partitioned by
/// collection.
#[async_trait]
pub trait ParentStore: Send + Sync {
    /// Store a parent chunk. Identities are globally unique and never
    /// reassigned, so writes are append-only.
    async fn put(&self, collection: &str, id: &str, content: &str) -> Result<()>;

    /// Fetch a parent chunk's text, or `None` when the identity is
    /// unknown (evicted or never stored).
    async fn get(&self, collection: &str, id: &str) -> Result<Option<String>>;
}

/// Durable parent store backed by the `parents` table.
pub struct SqliteParentStore {
    pool: SqlitePool,
}

impl SqliteParentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParentStore for SqliteParentStore {
    async fn put(&self, collection: &str, id: &str, content: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO parents (id, collection, content)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                collection = excluded.collection,
                content = excluded.content
            "#,
        )
        .bind(id)
        .bind(collection)
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("parent put: {}", e)))?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT content FROM parents WHERE id = ? AND collection = ?")
            .bind(id)
            .bind(collection)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("parent get: {}", e)))?;

        Ok(row.map(|r| r.get("content")))
    }
}

/// Process-local parent store. Contents are discarded on restart.
pub struct MemoryParentStore {
    entries: RwLock<HashMap<(String, String), String>>,
}

impl MemoryParentStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryParentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParentStore for MemoryParentStore {
    async fn put(&self, collection: &str, id: &str, content: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), content.to_string());
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }
}
