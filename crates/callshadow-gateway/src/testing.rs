//! Test double for the suggestion engine

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use callshadow_protocol::{ContextSnapshot, ConversationStats, Suggestion, Turn};

use crate::engine::SuggestionEngine;
use crate::error::EngineError;

/// Returns a canned suggestion, or fails every call when `failing` is set.
pub struct MockSuggestionEngine {
    suggestion: Suggestion,
    failing: bool,
    calls: AtomicUsize,
}

impl MockSuggestionEngine {
    pub fn new(direction: &str) -> Self {
        Self {
            suggestion: Suggestion {
                questions: vec!["Mock question?".to_string()],
                signals_detected: vec!["mock_signal".to_string()],
                recommended_direction: direction.to_string(),
            },
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            suggestion: Suggestion::default(),
            failing: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SuggestionEngine for MockSuggestionEngine {
    async fn suggest(
        &self,
        _latest: &Turn,
        _context: &ContextSnapshot,
        _stats: &ConversationStats,
    ) -> Result<Suggestion, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(EngineError::Failed("mock engine down".to_string()));
        }
        Ok(self.suggestion.clone())
    }
}
