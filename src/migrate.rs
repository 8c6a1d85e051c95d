//! Idempotent schema creation.
//!
//! One SQLite database carries all four stores: the chat log, the file
//! registry, the durable parent store, and the child vector index.
//! `collection` partitions parents and vectors into the two logical
//! tables the pipeline uses (`documents` for resumes, `jobs` for
//! postings).

use sqlx::SqlitePool;

use crate::error::{Error, Result};

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS chats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room INTEGER NOT NULL,
            role TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS parents (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            content TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS vectors (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            embedding BLOB NOT NULL,
            content_hash TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_chats_room_created ON chats(room, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_parents_collection ON parents(collection)",
        "CREATE INDEX IF NOT EXISTS idx_vectors_collection ON vectors(collection)",
    ];

    for stmt in statements {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| Error::Persistence(format!("migration failed: {}", e)))?;
    }

    Ok(())
}
