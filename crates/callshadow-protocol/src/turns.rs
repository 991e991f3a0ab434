//! Turn types for the conversation stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Client,
    Agent,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Agent => "agent",
        }
    }
}

/// Coarse sentiment label attached by the upstream analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// A validated inbound turn payload. Sequence number and timestamp are
/// assigned by the memory window on append, not by the caller.
///
/// The emotion label is an open set ("joy", "anger", "uncertain", ...) and is
/// validated by the upstream input layer, so it stays a plain string here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub text: String,
    pub speaker: Speaker,
    pub sentiment: Sentiment,
    pub emotion: String,
}

impl TurnInput {
    pub fn new(
        text: impl Into<String>,
        speaker: Speaker,
        sentiment: Sentiment,
        emotion: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            speaker,
            sentiment,
            emotion: emotion.into(),
        }
    }
}

/// One recorded utterance. Immutable after creation; ordering within a
/// session is solely by `sequence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub sequence: u64,
    pub text: String,
    pub speaker: Speaker,
    pub sentiment: Sentiment,
    pub emotion: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Build a turn from a validated payload, stamping it with the sequence
    /// number assigned by the window and the current time.
    pub fn from_input(sequence: u64, input: TurnInput) -> Self {
        Self {
            sequence,
            text: input.text,
            speaker: input.speaker,
            sentiment: input.sentiment,
            emotion: input.emotion,
            created_at: Utc::now(),
        }
    }
}
