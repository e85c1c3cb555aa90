//! Session Server
//!
//! Serves the session REST API and the browser WebSocket.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chess_session::store::{MemoryStore, SqliteStore};
use chess_session::CheckpointStore;
use chess_strategies::load_or_default;
use clap::Parser;
use session_server::{app, AppState, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "session-server")]
#[command(about = "Suspendable chess sessions over HTTP and WebSocket")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "server.toml")]
    config: PathBuf,
    /// Port to listen on (overrides the configuration)
    #[arg(short, long)]
    port: Option<u16>,
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: std::net::IpAddr,
    /// Keep sessions in memory instead of the SQLite database
    #[arg(long)]
    in_memory: bool,
}

fn open_store(cli: &Cli, config: &ServerConfig) -> anyhow::Result<Arc<dyn CheckpointStore>> {
    if cli.in_memory {
        return Ok(Arc::new(MemoryStore::new()));
    }
    if let Some(dir) = config.database.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("Failed to open {}", config.database.display()))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config: ServerConfig = load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let store = open_store(&cli, &config)?;
    let registry = config.registry();
    tracing::info!(
        strategies = ?registry.names().collect::<Vec<_>>(),
        default_strategy = %config.default_strategy,
        "strategy profiles loaded"
    );
    let state = AppState::new(store, registry, config.session_defaults());

    let addr = SocketAddr::new(cli.host, cli.port.unwrap_or(config.port));
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    axum::serve(listener, app(state))
        .await
        .context("Server error")?;
    Ok(())
}
