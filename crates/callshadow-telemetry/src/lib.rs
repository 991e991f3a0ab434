//! Callshadow Telemetry - tracing subscriber setup

mod subscriber;

pub use subscriber::{init_subscriber, TelemetryConfig};
