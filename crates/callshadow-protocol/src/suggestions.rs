//! Suggestion payload returned to the conversation operator

use serde::{Deserialize, Serialize};

/// Structured guidance produced by the model-invocation layer: questions to
/// ask next, signals detected in the conversation, and a recommended
/// strategic direction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub signals_detected: Vec<String>,
    #[serde(default)]
    pub recommended_direction: String,
}

impl Suggestion {
    /// Degraded-mode suggestion used when the model-invocation layer fails.
    /// The conversation keeps flowing; the operator sees a generic prompt.
    pub fn fallback() -> Self {
        Self {
            questions: vec!["Could you tell me more about that?".to_string()],
            signals_detected: vec!["system_error".to_string()],
            recommended_direction: "Continue the conversation while the system recovers."
                .to_string(),
        }
    }
}
