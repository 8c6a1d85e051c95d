//! # jobmatch
//!
//! A retrieval-augmented recruiter chat backend. Uploaded PDF resumes
//! and job postings are split into parent/child chunks and indexed as
//! vectors; each chat turn retrieves both context streams, packs job
//! postings under the model's token budget, and asks a chat model for a
//! recruiter-style answer, which is persisted to the chat log.
//!
//! ## Architecture
//!
//! ```text
//! user message ──▶ ParentChildRetriever ×2 ──▶ format (token budget)
//!                  (resume docs, jobs)              │
//!                                                   ▼
//!            persisted chat ◀── completion ◀── PromptAssembler
//! ```
//!
//! The pipeline is sequential and fail-fast: no stage retries, and a
//! failed turn never persists a partial answer.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`chunk`] | Character-window text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`completion`] | Chat completion and token counting |
//! | [`filter`] | Structured metadata filters |
//! | [`vector`] | Vector index backends |
//! | [`parent`] | Parent chunk storage |
//! | [`retriever`] | Two-tier parent/child retrieval |
//! | [`format`] | Token-budgeted job context formatting |
//! | [`prompt`] | Prompt assembly and the model call |
//! | [`pdf`] | PDF resume loading |
//! | [`chat`] | Chat orchestration entry points |

pub mod chat;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod format;
pub mod migrate;
pub mod models;
pub mod parent;
pub mod pdf;
pub mod prompt;
pub mod retriever;
pub mod vector;

pub use error::{Error, Result};
