//! Callshadow Protocol - Shared conversation types
//!
//! Value types exchanged between the transport layer, the memory
//! subsystem, and the model-invocation layer:
//! - Turns and their speaker/sentiment/emotion metadata
//! - Context snapshots handed to the model-invocation layer
//! - Aggregate conversation statistics
//! - Suggestions returned to the caller

mod context;
mod suggestions;
mod turns;

pub use context::{ContextSnapshot, ConversationStats, SentimentCounts};
pub use suggestions::Suggestion;
pub use turns::{Sentiment, Speaker, Turn, TurnInput};
