//! Core data models for the retrieval and chat pipeline.
//!
//! These types flow between ingestion, retrieval, formatting, and the
//! chat orchestrator. [`Document`] is immutable once retrieved; metadata
//! is a JSON object with a few well-known keys: `jobid`/`url`/`title`/
//! `geocode.countryCode` for job postings, `file_id` for resume chunks,
//! and `parent_id` linking child records to their parent chunk.

use serde::{Deserialize, Serialize};

/// A retrieved unit of context: text plus its metadata mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: serde_json::Value,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Look up a metadata field by dotted path (e.g. `geocode.countryCode`).
    pub fn metadata_path(&self, path: &str) -> Option<&serde_json::Value> {
        lookup_path(&self.metadata, path)
    }
}

/// Resolve a dotted path inside a JSON object.
pub(crate) fn lookup_path<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "bot" => Some(Role::Bot),
            _ => None,
        }
    }
}

/// A chat message within a room. Created on insert, never mutated.
/// `id` and `created_at` are assigned by the store; ordering within a
/// room is ascending by `created_at` (millisecond UTC timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Option<i64>,
    pub room: i64,
    pub role: Role,
    pub message: String,
    pub created_at: Option<i64>,
}

impl ChatMessage {
    /// A not-yet-persisted message.
    pub fn new(room: i64, role: Role, message: impl Into<String>) -> Self {
        Self {
            id: None,
            room,
            role,
            message: message.into(),
            created_at: None,
        }
    }
}

/// An uploaded resume file. One-to-many with document chunks via the
/// `file_id` metadata key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}
