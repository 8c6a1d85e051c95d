//! Chat orchestration: the end-to-end entry points the presentation
//! layer calls.
//!
//! [`ChatService`] wires the two retrieval streams (resume documents,
//! job postings) into the prompt assembler and persists the resulting
//! bot message. All collaborators are injected once at construction;
//! there is no hidden global client state.
//!
//! One turn runs `retrieve(resume) → retrieve(jobs) → format → complete
//! → persist`; a failure at any stage propagates unmodified and nothing
//! partial is persisted.

use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::completion::CompletionModel;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::filter::MetadataFilter;
use crate::models::{ChatMessage, Document, FileRecord, Role};
use crate::parent::{ParentStore, SqliteParentStore};
use crate::pdf;
use crate::prompt::PromptAssembler;
use crate::retriever::ParentChildRetriever;
use crate::vector::{SqliteVectorIndex, VectorIndex, COLLECTION_DOCUMENTS, COLLECTION_JOBS};

pub struct ChatService {
    pool: SqlitePool,
    resume_retriever: ParentChildRetriever,
    jobs_retriever: ParentChildRetriever,
    assembler: PromptAssembler,
    resume_child_k: usize,
    resume_parent_k: usize,
    job_child_k: usize,
    job_parent_k: usize,
    country_codes: Vec<String>,
    turn_timeout: Duration,
}

impl ChatService {
    /// Build the service with explicitly injected collaborators.
    pub fn new(
        config: &Config,
        pool: SqlitePool,
        index: Arc<dyn VectorIndex>,
        parents: Arc<dyn ParentStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn CompletionModel>,
    ) -> Self {
        let resume_retriever = ParentChildRetriever::new(
            COLLECTION_DOCUMENTS,
            index.clone(),
            parents.clone(),
            embeddings.clone(),
            config.chunking.clone(),
        );
        let jobs_retriever = ParentChildRetriever::new(
            COLLECTION_JOBS,
            index,
            parents,
            embeddings,
            config.chunking.clone(),
        );
        let assembler = PromptAssembler::new(model, config.prompt.reserve_tokens);

        Self {
            pool,
            resume_retriever,
            jobs_retriever,
            assembler,
            resume_child_k: config.retrieval.resume_child_k,
            resume_parent_k: config.retrieval.resume_parent_k,
            job_child_k: config.retrieval.job_child_k,
            job_parent_k: config.retrieval.job_parent_k,
            country_codes: config.retrieval.country_codes.clone(),
            turn_timeout: Duration::from_secs(config.prompt.turn_timeout_secs),
        }
    }

    /// Convenience constructor using the durable SQLite index and parent
    /// store on the same pool.
    pub fn with_sqlite_stores(
        config: &Config,
        pool: SqlitePool,
        embeddings: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn CompletionModel>,
    ) -> Self {
        let index = Arc::new(SqliteVectorIndex::new(pool.clone()));
        let parents = Arc::new(SqliteParentStore::new(pool.clone()));
        Self::new(config, pool, index, parents, embeddings, model)
    }

    /// The jobs ingestion entry point: parent/child-split postings into
    /// the `jobs` collection.
    pub async fn add_jobs(&self, postings: &[Document]) -> Result<()> {
        self.jobs_retriever.add_documents(postings).await
    }

    /// Fetch the chat log for a room, ascending by creation time.
    pub async fn fetch_chats(&self, room: i64) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, room, role, message, created_at FROM chats \
             WHERE room = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(room)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("chats select: {}", e)))?;

        rows.iter()
            .map(|row| {
                let role_str: String = row.get("role");
                let role = Role::parse(&role_str).ok_or_else(|| {
                    Error::Validation(format!("unknown chat role '{}'", role_str))
                })?;
                Ok(ChatMessage {
                    id: Some(row.get("id")),
                    room: row.get("room"),
                    role,
                    message: row.get("message"),
                    created_at: Some(row.get("created_at")),
                })
            })
            .collect()
    }

    /// Persist a chat message, returning it with its assigned id and
    /// timestamp.
    pub async fn post_chat(&self, chat: &ChatMessage) -> Result<ChatMessage> {
        let created_at = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO chats (room, role, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(chat.room)
        .bind(chat.role.as_str())
        .bind(&chat.message)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("chats insert: {}", e)))?;

        Ok(ChatMessage {
            id: Some(result.last_insert_rowid()),
            room: chat.room,
            role: chat.role,
            message: chat.message.clone(),
            created_at: Some(created_at),
        })
    }

    /// Run one full chat turn: retrieve both context streams, assemble
    /// the prompt, call the model, and persist the bot answer.
    ///
    /// The retrieval-through-completion phase runs under the configured
    /// turn deadline. On persistence failure the generated answer is
    /// discarded and [`Error::Persistence`] is raised.
    pub async fn get_answer(&self, chat: &ChatMessage, file_id: i64) -> Result<ChatMessage> {
        let answer = tokio::time::timeout(self.turn_timeout, self.answer_turn(chat, file_id))
            .await
            .map_err(|_| {
                warn!(room = chat.room, "chat turn deadline exceeded");
                Error::Completion(format!(
                    "chat turn timed out after {}s",
                    self.turn_timeout.as_secs()
                ))
            })??;

        let bot = ChatMessage::new(chat.room, Role::Bot, answer);
        self.post_chat(&bot).await
    }

    async fn answer_turn(&self, chat: &ChatMessage, file_id: i64) -> Result<String> {
        let resume_filter = MetadataFilter::eq("file_id", serde_json::json!(file_id));
        let resume_docs = self
            .resume_retriever
            .retrieve(
                &chat.message,
                self.resume_child_k,
                self.resume_parent_k,
                Some(&resume_filter),
            )
            .await?;

        let country_filter = MetadataFilter::is_in(
            "geocode.countryCode",
            self.country_codes
                .iter()
                .map(|c| serde_json::json!(c))
                .collect(),
        );
        let job_docs = self
            .jobs_retriever
            .retrieve(
                &chat.message,
                self.job_child_k,
                self.job_parent_k,
                Some(&country_filter),
            )
            .await?;

        debug!(
            room = chat.room,
            resume_docs = resume_docs.len(),
            job_docs = job_docs.len(),
            "context retrieved"
        );

        self.assembler
            .answer(&chat.message, &resume_docs, &job_docs)
            .await
    }

    /// List uploaded files, most recent first.
    pub async fn fetch_files(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, created_at FROM files ORDER BY created_at DESC, id DESC",
        )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("files select: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| FileRecord {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Register an uploaded PDF resume and ingest its pages into the
    /// resume collection, tagged with the new file's id.
    pub async fn save_file(&self, name: &str, bytes: &[u8]) -> Result<FileRecord> {
        let created_at = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query("INSERT INTO files (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("files insert: {}", e)))?;
        let file_id = result.last_insert_rowid();

        let pages = pdf::load_pdf(bytes)?;
        let documents: Vec<Document> = pages
            .into_iter()
            .map(|mut doc| {
                doc.metadata["file_id"] = serde_json::json!(file_id);
                doc.metadata["file_name"] = serde_json::json!(name);
                doc
            })
            .collect();

        self.resume_retriever.add_documents(&documents).await?;

        Ok(FileRecord {
            id: file_id,
            name: name.to_string(),
            created_at,
        })
    }
}
