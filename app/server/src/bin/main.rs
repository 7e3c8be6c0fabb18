//! Hillview server binary entry point.
//!
//! Loads TOML configuration, registers the initial object, and runs the
//! axum server with graceful shutdown on ctrl-c.

use anyhow::Result;
use hillview_server::{ServerConfig, config::CONFIG_FILE};
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing from RUST_LOG (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = ServerConfig::load_or_default(&config_path)?;

    let handle = hillview_server::serve(&config).await?;
    shutdown_signal().await;
    handle.shutdown().await?;
    tracing::info!("hillview server shut down");
    Ok(())
}

/// Wait for ctrl-c signal for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {e}");
    }
    tracing::info!("received shutdown signal");
}
