use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use callshadow_memory::{Session, SessionRegistry};
use callshadow_protocol::{ContextSnapshot, Suggestion, TurnInput};

use crate::engine::SuggestionEngine;
use crate::error::GatewayError;
use crate::protocol::{HealthResponse, StatsResponse, StatusResponse, WsErrorFrame};

/// How many recent turns are handed to the suggestion engine per request.
const PROMPT_CONTEXT_TURNS: usize = 20;

struct AppState {
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn SuggestionEngine>,
    start_time: Instant,
}

pub struct GatewayServer {
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn SuggestionEngine>,
}

impl GatewayServer {
    pub fn new(registry: Arc<SessionRegistry>, engine: Arc<dyn SuggestionEngine>) -> Self {
        Self { registry, engine }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            registry: Arc::clone(&self.registry),
            engine: Arc::clone(&self.engine),
            start_time: Instant::now(),
        });
        Router::new()
            .route("/health", axum::routing::get(health_handler))
            .route(
                "/api/sessions/{session_id}/process",
                axum::routing::post(process_handler),
            )
            .route(
                "/api/sessions/{session_id}/context",
                axum::routing::get(context_handler),
            )
            .route(
                "/api/sessions/{session_id}/stats",
                axum::routing::get(stats_handler),
            )
            .route(
                "/api/sessions/{session_id}/clear",
                axum::routing::post(clear_handler),
            )
            .route(
                "/api/sessions/{session_id}",
                axum::routing::delete(delete_handler),
            )
            .route("/ws/sessions/{session_id}", axum::routing::any(ws_handler))
            .with_state(state)
    }

    /// Bind, start the idle-session sweeper, and serve until shutdown.
    pub async fn start(&self, host: &str, port: u16) -> Result<(), GatewayError> {
        let app = self.router();
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))?;

        let config = self.registry.config();
        let _sweeper = spawn_sweeper(
            Arc::clone(&self.registry),
            config.idle_timeout(),
            config.sweep_interval(),
        );

        tracing::info!("Callshadow gateway listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))?;

        Ok(())
    }
}

/// Periodically sweep idle sessions out of the registry.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    idle_timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            registry.sweep_expired(idle_timeout).await;
        }
    })
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.registry.session_count().await,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Append the turn, then hand context + stats to the suggestion engine.
/// Engine failure degrades to the fallback suggestion; the turn is already
/// recorded either way.
async fn process_turn(state: &AppState, session: &Arc<Session>, input: TurnInput) -> Suggestion {
    let sequence = session.append(input).await;
    let context = session.context(Some(PROMPT_CONTEXT_TURNS)).await;
    let stats = session.stats().await;

    let Some(latest) = context.turns.last().cloned() else {
        // cleared concurrently between append and read
        return Suggestion::fallback();
    };

    match state.engine.suggest(&latest, &context, &stats).await {
        Ok(suggestion) => {
            tracing::debug!(
                session_id = %session.id(),
                sequence,
                questions = suggestion.questions.len(),
                signals = suggestion.signals_detected.len(),
                "suggestion generated"
            );
            suggestion
        }
        Err(error) => {
            tracing::error!(session_id = %session.id(), %error, "suggestion engine failed");
            Suggestion::fallback()
        }
    }
}

fn validate_turn(input: &TurnInput) -> Result<(), &'static str> {
    if input.text.trim().is_empty() {
        return Err("text must not be empty");
    }
    Ok(())
}

async fn process_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(input): Json<TurnInput>,
) -> Response {
    if let Err(details) = validate_turn(&input) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(WsErrorFrame::validation(details)),
        )
            .into_response();
    }
    let session = state.registry.get_or_create(&session_id).await;
    let suggestion = process_turn(&state, &session, input).await;
    Json(suggestion).into_response()
}

#[derive(Debug, Deserialize)]
struct ContextQuery {
    max_turns: Option<usize>,
}

async fn context_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<ContextQuery>,
) -> Result<Json<ContextSnapshot>, GatewayError> {
    let session = state
        .registry
        .get(&session_id)
        .await
        .map_err(|_| GatewayError::SessionNotFound(session_id))?;
    Ok(Json(session.context(query.max_turns).await))
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatsResponse>, GatewayError> {
    let session = state
        .registry
        .get(&session_id)
        .await
        .map_err(|_| GatewayError::SessionNotFound(session_id))?;
    let stats = session.stats().await;
    let last = session.last_turn().await;
    Ok(Json(StatsResponse {
        stats,
        last_speaker: last.as_ref().map(|t| t.speaker),
        last_sentiment: last.as_ref().map(|t| t.sentiment),
        last_emotion: last.map(|t| t.emotion),
    }))
}

async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, GatewayError> {
    let session = state
        .registry
        .get(&session_id)
        .await
        .map_err(|_| GatewayError::SessionNotFound(session_id.clone()))?;
    session.clear().await;
    Ok(Json(StatusResponse {
        status: "cleared",
        message: format!("Conversation memory cleared for session {}", session_id),
    }))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<StatusResponse> {
    let removed = state.registry.delete(&session_id).await;
    Json(StatusResponse {
        status: "deleted",
        message: if removed {
            format!("Session {} removed", session_id)
        } else {
            format!("Session {} was not present", session_id)
        },
    })
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

/// One frame in, one frame out: each text frame is a turn payload, each
/// reply is a suggestion or an error frame.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, session_id: String) {
    let session = state.registry.get_or_create(&session_id).await;
    tracing::info!(session_id = %session_id, "WebSocket stream opened");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => continue,
        };

        let reply = match serde_json::from_str::<serde_json::Value>(&text) {
            Err(e) => serde_json::to_string(&WsErrorFrame::json_decode(e.to_string())),
            Ok(value) => match serde_json::from_value::<TurnInput>(value) {
                Err(e) => serde_json::to_string(&WsErrorFrame::validation(e.to_string())),
                Ok(input) => match validate_turn(&input) {
                    Err(details) => serde_json::to_string(&WsErrorFrame::validation(details)),
                    Ok(()) => {
                        let suggestion = process_turn(&state, &session, input).await;
                        serde_json::to_string(&suggestion)
                    }
                },
            },
        };

        let reply = reply.unwrap_or_default();
        if socket.send(Message::text(reply)).await.is_err() {
            break;
        }
    }
    tracing::info!(session_id = %session_id, "WebSocket stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite;

    use callshadow_memory::MemoryConfig;
    use crate::testing::MockSuggestionEngine;

    fn test_registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(
            MemoryConfig::default()
                .with_capacity(10)
                .with_soft_threshold(8),
        ))
    }

    async fn start_test_server(engine: Arc<dyn SuggestionEngine>) -> (String, Arc<SessionRegistry>) {
        let registry = test_registry();
        let server = GatewayServer::new(Arc::clone(&registry), engine);
        let app = server.router();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("127.0.0.1:{}", addr.port()), registry)
    }

    fn turn_json(text: &str) -> serde_json::Value {
        serde_json::json!({
            "text": text,
            "speaker": "client",
            "sentiment": "negative",
            "emotion": "uncertain"
        })
    }

    #[tokio::test]
    async fn test_process_returns_engine_suggestion() {
        let engine = Arc::new(MockSuggestionEngine::new("clarify pricing"));
        let (addr, _) = start_test_server(engine.clone()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{}/api/sessions/call-1/process", addr))
            .json(&turn_json("I'm not sure about the pricing."))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["questions"][0], "Mock question?");
        assert_eq!(body["recommended_direction"], "clarify pricing");
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn test_engine_failure_degrades_to_fallback() {
        let engine = Arc::new(MockSuggestionEngine::failing());
        let (addr, registry) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{}/api/sessions/call-1/process", addr))
            .json(&turn_json("hello"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["signals_detected"][0], "system_error");

        // the turn itself was still recorded
        let session = registry.get("call-1").await.unwrap();
        assert_eq!(session.turn_count().await, 1);
    }

    #[tokio::test]
    async fn test_process_rejects_empty_text() {
        let engine = Arc::new(MockSuggestionEngine::new("unused"));
        let (addr, registry) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{}/api/sessions/call-1/process", addr))
            .json(&turn_json("   "))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
        // rejected before reaching the memory core
        assert!(registry.get("call-1").await.is_err());
    }

    #[tokio::test]
    async fn test_process_rejects_unknown_speaker() {
        let engine = Arc::new(MockSuggestionEngine::new("unused"));
        let (addr, _) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{}/api/sessions/call-1/process", addr))
            .json(&serde_json::json!({
                "text": "hi",
                "speaker": "operator",
                "sentiment": "neutral",
                "emotion": "neutral"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 422);
    }

    #[tokio::test]
    async fn test_context_endpoint() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, _) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        for i in 1..=4 {
            client
                .post(format!("http://{}/api/sessions/call-2/process", addr))
                .json(&turn_json(&format!("T{i}")))
                .send()
                .await
                .unwrap();
        }

        let resp = client
            .get(format!("http://{}/api/sessions/call-2/context", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["turns"].as_array().unwrap().len(), 4);
        assert_eq!(body["turns"][0]["text"], "T1");
        assert_eq!(body["turns"][3]["sequence"], 4);

        let resp = client
            .get(format!(
                "http://{}/api/sessions/call-2/context?max_turns=2",
                addr
            ))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["turns"].as_array().unwrap().len(), 2);
        assert_eq!(body["turns"][0]["text"], "T3");
    }

    #[tokio::test]
    async fn test_context_unknown_session_is_404() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, _) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("http://{}/api/sessions/ghost/context", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_stats_endpoint_reports_last_labels() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, _) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        client
            .post(format!("http://{}/api/sessions/call-3/process", addr))
            .json(&turn_json("first"))
            .send()
            .await
            .unwrap();

        let resp = client
            .get(format!("http://{}/api/sessions/call-3/stats", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["stats"]["total_turns"], 1);
        assert_eq!(body["stats"]["sentiments"]["negative"], 1);
        assert_eq!(body["last_speaker"], "client");
        assert_eq!(body["last_emotion"], "uncertain");
    }

    #[tokio::test]
    async fn test_clear_endpoint_empties_memory() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, registry) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        client
            .post(format!("http://{}/api/sessions/call-4/process", addr))
            .json(&turn_json("hello"))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("http://{}/api/sessions/call-4/clear", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let session = registry.get("call-4").await.unwrap();
        assert_eq!(session.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, registry) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        client
            .post(format!("http://{}/api/sessions/call-5/process", addr))
            .json(&turn_json("hello"))
            .send()
            .await
            .unwrap();
        assert_eq!(registry.session_count().await, 1);

        for _ in 0..2 {
            let resp = client
                .delete(format!("http://{}/api/sessions/call-5", addr))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
        }
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, _) = start_test_server(engine).await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
        assert!(body["version"].is_string());
    }

    async fn ws_connect(
        addr: &str,
        session_id: &str,
    ) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>
    {
        let (ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{}/ws/sessions/{}", addr, session_id))
                .await
                .unwrap();
        ws
    }

    async fn ws_send_and_recv(
        ws: &mut tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        msg: &str,
    ) -> serde_json::Value {
        ws.send(tungstenite::Message::Text(msg.into())).await.unwrap();
        let resp = ws.next().await.unwrap().unwrap();
        serde_json::from_str(&resp.into_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_ws_turn_roundtrip() {
        let engine = Arc::new(MockSuggestionEngine::new("ws direction"));
        let (addr, registry) = start_test_server(engine).await;
        let mut ws = ws_connect(&addr, "ws-1").await;

        let resp = ws_send_and_recv(&mut ws, &turn_json("streamed turn").to_string()).await;
        assert_eq!(resp["recommended_direction"], "ws direction");

        let session = registry.get("ws-1").await.unwrap();
        assert_eq!(session.turn_count().await, 1);
    }

    #[tokio::test]
    async fn test_ws_malformed_json() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, _) = start_test_server(engine).await;
        let mut ws = ws_connect(&addr, "ws-2").await;

        let resp = ws_send_and_recv(&mut ws, "not json at all").await;
        assert_eq!(resp["error"], "json_decode_error");
    }

    #[tokio::test]
    async fn test_ws_validation_error() {
        let engine = Arc::new(MockSuggestionEngine::new("ok"));
        let (addr, registry) = start_test_server(engine).await;
        let mut ws = ws_connect(&addr, "ws-3").await;

        let resp = ws_send_and_recv(
            &mut ws,
            r#"{"text": "hi", "speaker": "operator", "sentiment": "neutral", "emotion": "calm"}"#,
        )
        .await;
        assert_eq!(resp["error"], "validation_error");

        let resp = ws_send_and_recv(&mut ws, &turn_json("").to_string()).await;
        assert_eq!(resp["error"], "validation_error");

        // the window was opened by the connection but holds no turns
        let session = registry.get("ws-3").await.unwrap();
        assert_eq!(session.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_removes_idle_sessions() {
        let registry = test_registry();
        registry.get_or_create("stale").await;

        let _handle = spawn_sweeper(
            Arc::clone(&registry),
            Duration::from_millis(30),
            Duration::from_millis(20),
        );
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(registry.session_count().await, 0);
    }
}
