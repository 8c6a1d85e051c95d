//! Error taxonomy for the jobmatch pipeline.
//!
//! Every failure surfaces to the immediate caller unmodified: there is no
//! local recovery and no automatic retry anywhere in the pipeline. A failed
//! chat turn returns an error rather than a partial or empty answer; the
//! caller decides whether to display it or retry the whole turn.

use thiserror::Error;

/// The top-level error type for all jobmatch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials or invalid settings. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Token counting failed while packing job context. Aborts the
    /// whole format call.
    #[error("token counting failed: {0}")]
    TokenCount(String),

    /// The vector index or embedding backend is unreachable. Callers
    /// must not retry silently.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The model completion call failed (timeout, quota, malformed
    /// response).
    #[error("completion failed: {0}")]
    Completion(String),

    /// A write to the relational store failed. The generated answer, if
    /// any, is discarded.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Malformed input documents or metadata.
    #[error("invalid input: {0}")]
    Validation(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_detail() {
        let err = Error::RetrievalUnavailable("jobs index: connection refused".into());
        let msg = err.to_string();
        assert!(msg.contains("retrieval unavailable"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn persistence_is_distinct_from_retrieval() {
        let a = Error::Persistence("chats insert failed".into()).to_string();
        let b = Error::RetrievalUnavailable("vectors query failed".into()).to_string();
        assert_ne!(a, b);
    }
}
