//! Token-budget-aware job context formatting.
//!
//! Renders scored job documents into fixed-field text blocks and greedily
//! packs them under the model's context budget. A document whose block
//! does not fit is skipped, not terminal: a shorter document later in the
//! ranking may still fit, so the scan always runs to the end.

use tracing::debug;

use crate::completion::CompletionModel;
use crate::error::{Error, Result};
use crate::models::Document;

/// Separator line between accepted job blocks.
pub const JOB_SEPARATOR: &str = "\n\n-----------------------------\n\n";

/// Collapse every run of newline characters into a single space.
///
/// Applied to free-text fields before measurement and inclusion so they
/// cannot break the block template or inflate the token count. Idempotent.
pub fn single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_newlines = false;
    for ch in text.chars() {
        if ch == '\n' {
            in_newlines = true;
        } else {
            if in_newlines {
                out.push(' ');
                in_newlines = false;
            }
            out.push(ch);
        }
    }
    if in_newlines {
        out.push(' ');
    }
    out
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_job_block(doc: &Document) -> Result<String> {
    let jobid = doc
        .metadata_path("jobid")
        .ok_or_else(|| Error::Validation("job document missing 'jobid' metadata".into()))?;
    let url = doc
        .metadata_path("url")
        .ok_or_else(|| Error::Validation("job document missing 'url' metadata".into()))?;
    let title = doc
        .metadata_path("title")
        .ok_or_else(|| Error::Validation("job document missing 'title' metadata".into()))?;

    Ok(format!(
        "JobId: {}\nJob Url: {}\nJob Title: {}\nJob Description: {}",
        scalar_to_string(jobid),
        scalar_to_string(url),
        single_line(&scalar_to_string(title)),
        single_line(&doc.content),
    ))
}

/// Greedily pack job documents into a single string without exceeding
/// `max_tokens - reserve` tokens.
///
/// Documents are considered in input order (descending similarity). The
/// sum of counted tokens over accepted blocks is strictly less than the
/// budget. Returns an empty string when no document fits. A token-count
/// failure aborts the whole call.
pub async fn format_jobs_as_string(
    documents: &[Document],
    model: &dyn CompletionModel,
    max_tokens: usize,
    reserve: usize,
) -> Result<String> {
    let budget = max_tokens.saturating_sub(reserve);
    let mut total_length = 0usize;
    let mut contexts: Vec<String> = Vec::new();

    for doc in documents {
        let block = render_job_block(doc)?;
        let token_length = model.count_tokens(&block).await?;
        if total_length + token_length < budget {
            contexts.push(block);
            total_length += token_length;
        }
        // Skip and keep scanning: later documents may be shorter.
    }

    debug!(
        candidates = documents.len(),
        accepted = contexts.len(),
        tokens = total_length,
        budget,
        "formatted job context"
    );
    Ok(contexts.join(JOB_SEPARATOR))
}
