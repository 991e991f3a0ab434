//! Test doubles for the summarization collaborator

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use callshadow_protocol::Turn;

use crate::{Summarizer, SummarizerError};

/// Scriptable summarizer: fixed response text, optional delay, optional
/// persistent failure. Counts calls so tests can assert back-pressure.
pub struct MockSummarizer {
    response: String,
    delay: Option<Duration>,
    error: Option<SummarizerError>,
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            delay: None,
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering; combine with a short caller timeout
    /// to exercise the timeout path.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with the given error.
    pub fn failing(mut self, error: SummarizerError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, turns: &[Turn], _max_chars: usize) -> Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(format!("{} ({} turns)", self.response, turns.len()))
    }
}
