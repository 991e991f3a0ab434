//! Seam toward the model-invocation layer
//!
//! The memory core hands back structured data; turning it into prompt text
//! and calling a model is this layer's job. No provider protocol is fixed
//! here: implement `SuggestionEngine` against whichever backend applies.

use async_trait::async_trait;
use callshadow_protocol::{ContextSnapshot, ConversationStats, Sentiment, Suggestion, Turn};

use crate::error::EngineError;

/// Produces operator guidance from the latest turn plus the rendered
/// conversation state.
#[async_trait]
pub trait SuggestionEngine: Send + Sync {
    async fn suggest(
        &self,
        latest: &Turn,
        context: &ContextSnapshot,
        stats: &ConversationStats,
    ) -> Result<Suggestion, EngineError>;
}

/// Render a context snapshot as human-readable lines, one per turn, tagged
/// with speaker, sentiment, and emotion. Presentation only; the core stays
/// decoupled from prompt wording.
pub fn render_context(snapshot: &ContextSnapshot) -> String {
    if snapshot.is_empty() {
        return "No conversation in progress.".to_string();
    }
    let mut lines = Vec::with_capacity(snapshot.turns.len() + 1);
    if let Some(summary) = &snapshot.summary_text {
        lines.push(format!("Earlier conversation (summarized): {summary}"));
    }
    for turn in &snapshot.turns {
        lines.push(format!(
            "[{}] (sentiment: {}, emotion: {}): {}",
            turn.speaker.as_str().to_uppercase(),
            turn.sentiment.as_str(),
            turn.emotion,
            turn.text
        ));
    }
    lines.join("\n")
}

/// Deterministic engine keyed off the latest turn's labels. Used when no
/// model-backed engine is wired in; keeps the gateway functional end to end.
pub struct RuleBasedEngine;

#[async_trait]
impl SuggestionEngine for RuleBasedEngine {
    async fn suggest(
        &self,
        latest: &Turn,
        _context: &ContextSnapshot,
        _stats: &ConversationStats,
    ) -> Result<Suggestion, EngineError> {
        let mut signals = Vec::new();
        match latest.sentiment {
            Sentiment::Negative => signals.push("objection or friction".to_string()),
            Sentiment::Positive => signals.push("interest expressed".to_string()),
            Sentiment::Neutral => {}
        }
        if latest.emotion == "uncertain" {
            signals.push("hesitation".to_string());
        }

        let (questions, recommended_direction) = match latest.sentiment {
            Sentiment::Negative => (
                vec![
                    "What part of this is the biggest concern for you?".to_string(),
                    "What would need to change for this to work?".to_string(),
                ],
                "Address the objection directly before moving on.".to_string(),
            ),
            Sentiment::Positive => (
                vec!["Would you like to go over the next steps?".to_string()],
                "Build on the expressed interest and move toward a commitment.".to_string(),
            ),
            Sentiment::Neutral => (
                vec!["Could you tell me more about what you're looking for?".to_string()],
                "Keep the conversation open and probe for needs.".to_string(),
            ),
        };

        Ok(Suggestion {
            questions,
            signals_detected: signals,
            recommended_direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callshadow_protocol::{Speaker, TurnInput};

    fn turn(sentiment: Sentiment, emotion: &str) -> Turn {
        Turn::from_input(
            1,
            TurnInput::new("some text", Speaker::Client, sentiment, emotion),
        )
    }

    #[test]
    fn test_render_empty_context() {
        let snapshot = ContextSnapshot {
            summary_text: None,
            turns: vec![],
        };
        assert_eq!(render_context(&snapshot), "No conversation in progress.");
    }

    #[test]
    fn test_render_tags_speaker_and_labels() {
        let snapshot = ContextSnapshot {
            summary_text: Some("greeted, asked about pricing".to_string()),
            turns: vec![turn(Sentiment::Negative, "uncertain")],
        };
        let rendered = render_context(&snapshot);
        assert!(rendered.starts_with("Earlier conversation (summarized): greeted"));
        assert!(rendered.contains("[CLIENT] (sentiment: negative, emotion: uncertain): some text"));
    }

    #[tokio::test]
    async fn test_rule_based_engine_flags_hesitation() {
        let latest = turn(Sentiment::Negative, "uncertain");
        let snapshot = ContextSnapshot {
            summary_text: None,
            turns: vec![latest.clone()],
        };
        let suggestion = RuleBasedEngine
            .suggest(&latest, &snapshot, &ConversationStats::default())
            .await
            .unwrap();
        assert!(suggestion
            .signals_detected
            .contains(&"hesitation".to_string()));
        assert_eq!(suggestion.questions.len(), 2);
        assert!(!suggestion.recommended_direction.is_empty());
    }
}
