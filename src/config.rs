//! TOML configuration parsing and validation.
//!
//! Configuration is loaded once at process start and passed by reference
//! into each component; there are no lazily-constructed global clients.
//! The OpenAI API key is deliberately kept out of the file and read from
//! the `OPENAI_API_KEY` environment variable when providers are built.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Context window of the chat model, in tokens.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            embedding_model: default_embedding_model(),
            embedding_dims: default_embedding_dims(),
            timeout_secs: default_timeout_secs(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f64 {
    0.9
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_embedding_dims() -> usize {
    1536
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_context_tokens() -> usize {
    128_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Parent chunk target size, in characters. No overlap.
    #[serde(default = "default_parent_chunk_chars")]
    pub parent_chunk_chars: usize,
    /// Child chunk target size, in characters.
    #[serde(default = "default_child_chunk_chars")]
    pub child_chunk_chars: usize,
    /// Overlap between consecutive child chunks, in characters.
    #[serde(default = "default_child_overlap_chars")]
    pub child_overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            parent_chunk_chars: default_parent_chunk_chars(),
            child_chunk_chars: default_child_chunk_chars(),
            child_overlap_chars: default_child_overlap_chars(),
        }
    }
}

fn default_parent_chunk_chars() -> usize {
    10_000
}
fn default_child_chunk_chars() -> usize {
    250
}
fn default_child_overlap_chars() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Child matches fetched per jobs query.
    #[serde(default = "default_job_child_k")]
    pub job_child_k: usize,
    /// Distinct parent documents returned per jobs query.
    #[serde(default = "default_job_parent_k")]
    pub job_parent_k: usize,
    /// Child matches fetched per resume query.
    #[serde(default = "default_resume_child_k")]
    pub resume_child_k: usize,
    /// Distinct parent documents returned per resume query.
    #[serde(default = "default_resume_parent_k")]
    pub resume_parent_k: usize,
    /// Job postings are restricted to these geocode country codes.
    #[serde(default = "default_country_codes")]
    pub country_codes: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            job_child_k: default_job_child_k(),
            job_parent_k: default_job_parent_k(),
            resume_child_k: default_resume_child_k(),
            resume_parent_k: default_resume_parent_k(),
            country_codes: default_country_codes(),
        }
    }
}

fn default_job_child_k() -> usize {
    100
}
fn default_job_parent_k() -> usize {
    20
}
fn default_resume_child_k() -> usize {
    10
}
fn default_resume_parent_k() -> usize {
    2
}
fn default_country_codes() -> Vec<String> {
    vec!["US".to_string(), "REMOTE".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Token headroom left for the question and system instructions.
    #[serde(default = "default_reserve_tokens")]
    pub reserve_tokens: usize,
    /// End-to-end deadline for one chat turn, in seconds.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            reserve_tokens: default_reserve_tokens(),
            turn_timeout_secs: default_turn_timeout_secs(),
        }
    }
}

fn default_reserve_tokens() -> usize {
    500
}
fn default_turn_timeout_secs() -> u64 {
    120
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    validate(&config)?;
    Ok(config)
}

/// Validate a config built in code or parsed from TOML.
pub fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        return Err(Error::Config("db.path must be set".into()));
    }
    if config.chunking.child_chunk_chars < 4 {
        // Must hold a whole UTF-8 character, which is up to 4 bytes.
        return Err(Error::Config(
            "chunking.child_chunk_chars must be at least 4".into(),
        ));
    }
    if config.chunking.child_overlap_chars >= config.chunking.child_chunk_chars {
        return Err(Error::Config(
            "chunking.child_overlap_chars must be smaller than child_chunk_chars".into(),
        ));
    }
    if config.chunking.child_chunk_chars > config.chunking.parent_chunk_chars {
        return Err(Error::Config(
            "chunking.child_chunk_chars must not exceed parent_chunk_chars".into(),
        ));
    }
    if config.retrieval.job_parent_k == 0 || config.retrieval.resume_parent_k == 0 {
        return Err(Error::Config("retrieval parent_k values must be >= 1".into()));
    }
    if config.prompt.reserve_tokens >= config.openai.max_context_tokens {
        return Err(Error::Config(
            "prompt.reserve_tokens must be smaller than openai.max_context_tokens".into(),
        ));
    }
    if config.openai.embedding_dims == 0 {
        return Err(Error::Config("openai.embedding_dims must be > 0".into()));
    }
    Ok(())
}
