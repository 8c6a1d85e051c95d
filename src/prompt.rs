//! Prompt assembly and the single model call per turn.
//!
//! Two independently retrieved context streams (resume parents, formatted
//! job blocks) are substituted into a fixed system template, the raw user
//! question fills the user turn, and exactly one completion call is
//! issued. Template substitution is plain named-placeholder replacement;
//! there is no templating engine.

use std::sync::Arc;

use crate::completion::{ChatTurn, CompletionModel};
use crate::error::Result;
use crate::format::format_jobs_as_string;
use crate::models::Document;

/// System instruction with `{context}` (resume) and `{jobs}` placeholders.
pub const SYSTEM_TEMPLATE: &str = r#"You are an enthusiastic job recruiter who wants to help a candidate find the most appropriate job match for their resume.
The candidate has provided their resume and you have a list of jobs to choose from.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
----------------
Resume: """
{context}
"""
----------------
Jobs:
{jobs}
"#;

/// Replace `{name}` placeholders with their values.
///
/// Single pass over the template: substituted values are emitted
/// verbatim and never re-scanned, so a placeholder-shaped string inside
/// retrieved content cannot trigger a second substitution. Unknown
/// placeholders are left as-is.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail.find('}') {
            Some(close) => {
                let name = &tail[1..close];
                match values.iter().find(|(n, _)| *n == name) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&tail[..=close]),
                }
                rest = &tail[close + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub struct PromptAssembler {
    model: Arc<dyn CompletionModel>,
    reserve_tokens: usize,
}

impl PromptAssembler {
    pub fn new(model: Arc<dyn CompletionModel>, reserve_tokens: usize) -> Self {
        Self {
            model,
            reserve_tokens,
        }
    }

    /// Assemble the prompt from both context streams and drive one model
    /// call, returning the raw text completion.
    pub async fn answer(
        &self,
        question: &str,
        resume_docs: &[Document],
        job_docs: &[Document],
    ) -> Result<String> {
        let context = resume_docs
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let jobs = format_jobs_as_string(
            job_docs,
            self.model.as_ref(),
            self.model.max_context_tokens(),
            self.reserve_tokens,
        )
        .await?;

        let system = render_template(
            SYSTEM_TEMPLATE,
            &[("context", context.as_str()), ("jobs", jobs.as_str())],
        );

        let messages = [ChatTurn::system(system), ChatTurn::user(question)];
        self.model.complete(&messages).await
    }
}
