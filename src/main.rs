//! Gateway entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                   GAME GATEWAY                    │
//!                    │                                                   │
//!   Client ──────────┼─▶ admission ──▶ dispatch ──▶ resilience executor ─┼──▶ Backend
//!   (REST / WS)      │      gate        rules        (retry + circuit)   │    replicas
//!                    │                    │                              │
//!                    │                    └──▶ transaction coordinator ──┼──▶ both
//!                    │                         (prepare/commit/rollback) │    participants
//!                    │                                                   │
//!                    │   resolver (round-robin + replica naming)         │
//!                    │   registry (keyed list store)                     │
//!                    │   health monitor · metrics · shutdown             │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_gateway::config::loader::load_config;
use game_gateway::config::GatewayConfig;
use game_gateway::http::GatewayServer;
use game_gateway::lifecycle::Shutdown;
use game_gateway::observability::metrics;
use game_gateway::registry::{RedisStore, RegistryStore};

#[derive(Parser)]
#[command(name = "game-gateway")]
#[command(about = "Resilient request-routing gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "game_gateway={},tower_http=debug",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("game-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        store_url = %config.registry.url,
        concurrent_task_limit = config.admission.concurrent_task_limit,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let store: Arc<dyn RegistryStore> = Arc::new(RedisStore::new(&config.registry.url)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = GatewayServer::new(config, store, metrics_handle);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
