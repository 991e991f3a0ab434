use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use callshadow_config::load_or_default;
use callshadow_gateway::{GatewayServer, RuleBasedEngine};
use callshadow_memory::SessionRegistry;
use callshadow_telemetry::init_subscriber;

/// Real-time call assistance gateway
#[derive(Debug, Parser)]
#[command(name = "callshadow", version, about)]
struct Cli {
    /// Path to a config file (jsonc, json, or yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_subscriber(&config.telemetry);
    match &cli.config {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::info!("Using discovered or default configuration"),
    }

    let registry = Arc::new(SessionRegistry::new(config.memory.clone()));
    let server = GatewayServer::new(registry, Arc::new(RuleBasedEngine));
    server.start(&config.server.host, config.server.port).await?;

    Ok(())
}
