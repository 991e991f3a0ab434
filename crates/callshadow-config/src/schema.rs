use callshadow_memory::MemoryConfig;
use callshadow_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Bind address for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallshadowConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub memory: MemoryConfig,
}
