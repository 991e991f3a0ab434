//! Summarization collaborator contract

use async_trait::async_trait;
use callshadow_protocol::Turn;

use crate::SummarizerError;

/// Condenses a batch of old turns into short text, typically by calling an
/// external model.
///
/// Contract: side-effect-free on the window (returns a value, mutates
/// nothing shared) and retryable for the same input. The caller enforces the
/// timeout and treats timeout and error identically, so implementations
/// never need to roll back anything.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `turns` (oldest first) into at most `max_chars` characters.
    async fn summarize(&self, turns: &[Turn], max_chars: usize) -> Result<String, SummarizerError>;
}
