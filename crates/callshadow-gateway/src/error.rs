use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Gateway server error: {0}")]
    ServerError(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "details": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Failure of the model-invocation layer. The gateway degrades to a
/// fallback suggestion instead of surfacing this to the client.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("suggestion engine failed: {0}")]
    Failed(String),
}
