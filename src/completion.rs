//! Completion model abstraction and the OpenAI chat implementation.
//!
//! The model collaborator carries three capabilities: a synchronous chat
//! completion call, token counting for budget math, and the configured
//! context window size. This layer performs no retries; any failure
//! surfaces to the caller as [`Error::Completion`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

/// Approximate chars-per-token ratio used by the OpenAI counter.
const CHARS_PER_TOKEN: usize = 4;

/// One turn of an assembled prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }
}

/// A chat completion backend plus its token accounting.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Context window of the model, in tokens.
    fn max_context_tokens(&self) -> usize;

    /// Count tokens in `text`. Failures abort the surrounding format
    /// call with [`Error::TokenCount`].
    async fn count_tokens(&self, text: &str) -> Result<usize>;

    /// Issue exactly one completion call and return the raw text output.
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String>;
}

/// Chat completions via `POST /v1/chat/completions` on the OpenAI API.
pub struct OpenAiChat {
    model: String,
    temperature: f64,
    max_context_tokens: usize,
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiChat {
    /// Build the client from configuration. The API key is read from
    /// `OPENAI_API_KEY`; a missing key is fatal at startup.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_context_tokens: config.max_context_tokens,
            client,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionModel for OpenAiChat {
    fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    async fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.chars().count().div_ceil(CHARS_PER_TOKEN))
    }

    async fn complete(&self, messages: &[ChatTurn]) -> Result<String> {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        TurnRole::System => "system",
                        TurnRole::User => "user",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": self.temperature,
            "stream": false,
        });

        debug!(model = %self.model, turns = messages.len(), "sending completion request");

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "completion API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("invalid completion response: {}", e)))?;

        parse_completion_response(&json)
    }
}

fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Completion("completion response has no message content".into()))
}
