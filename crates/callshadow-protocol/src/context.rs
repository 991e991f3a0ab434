//! Context and statistics types handed to the model-invocation layer

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::turns::{Sentiment, Speaker, Turn};

/// Bounded view of recent conversation state: the accumulated summary of
/// compacted turns (if any) plus the live turns, oldest first.
///
/// This is structured data, not a prompt string; rendering is the caller's
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    pub turns: Vec<Turn>,
}

impl ContextSnapshot {
    pub fn is_empty(&self) -> bool {
        self.summary_text.is_none() && self.turns.is_empty()
    }
}

/// Sentiment histogram with a fixed shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl SentimentCounts {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }
}

/// Aggregate counts over the live turns of one window.
///
/// Emotions are an open label set, so they stay a map; everything else has
/// named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_turns: u64,
    pub client_turns: u64,
    pub agent_turns: u64,
    pub sentiments: SentimentCounts,
    pub emotions: BTreeMap<String, u64>,
}

impl ConversationStats {
    pub fn record(&mut self, turn: &Turn) {
        self.total_turns += 1;
        match turn.speaker {
            Speaker::Client => self.client_turns += 1,
            Speaker::Agent => self.agent_turns += 1,
        }
        self.sentiments.record(turn.sentiment);
        *self.emotions.entry(turn.emotion.clone()).or_insert(0) += 1;
    }
}
