//! Memory subsystem error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Raised only by explicit lookups; `get_or_create` never fails.
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// Errors from the summarization collaborator. The compaction task treats
/// every variant the same way: log, keep the turns, return to idle.
#[derive(Debug, Clone, Error)]
pub enum SummarizerError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summarization failed: {0}")]
    Failed(String),
}
