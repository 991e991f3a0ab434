//! HTTP/WebSocket gateway for the Callshadow assistant.
//!
//! Validates inbound turns, routes them into per-session memory windows,
//! and hands the resulting context + statistics to the suggestion engine.
//! The memory subsystem never calls the model-invocation path itself.

mod engine;
mod error;
mod protocol;
mod server;
pub mod testing;

pub use engine::{render_context, RuleBasedEngine, SuggestionEngine};
pub use error::{EngineError, GatewayError};
pub use server::{spawn_sweeper, GatewayServer};
