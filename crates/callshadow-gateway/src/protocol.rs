//! Wire shapes for the REST and WebSocket surfaces

use callshadow_protocol::{ConversationStats, Sentiment, Speaker};
use serde::Serialize;

/// Error frame sent over a WebSocket in place of a suggestion. The `error`
/// discriminant distinguishes undecodable JSON from well-formed JSON that
/// fails turn validation.
#[derive(Debug, Serialize)]
pub struct WsErrorFrame {
    pub error: &'static str,
    pub details: String,
}

impl WsErrorFrame {
    pub fn json_decode(details: impl Into<String>) -> Self {
        Self {
            error: "json_decode_error",
            details: details.into(),
        }
    }

    pub fn validation(details: impl Into<String>) -> Self {
        Self {
            error: "validation_error",
            details: details.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub version: &'static str,
}

/// Aggregate stats plus the labels of the most recent turn.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: ConversationStats,
    pub last_speaker: Option<Speaker>,
    pub last_sentiment: Option<Sentiment>,
    pub last_emotion: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_error_frame_shape() {
        let frame = WsErrorFrame::validation("text must not be empty");
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"error\":\"validation_error\""));
        assert!(json.contains("text must not be empty"));
    }

    #[test]
    fn test_stats_response_serializes_labels() {
        let response = StatsResponse {
            stats: ConversationStats::default(),
            last_speaker: Some(Speaker::Client),
            last_sentiment: Some(Sentiment::Negative),
            last_emotion: Some("uncertain".to_string()),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"last_speaker\":\"client\""));
        assert!(json.contains("\"last_sentiment\":\"negative\""));
    }
}
