//! Server command.

use anyhow::Result;
use clap::Args;
use server::{ServerConfig, config::CONFIG_FILE};
use std::path::PathBuf;

/// Run the RPC server.
#[derive(Args, Debug)]
pub struct Serve {
    /// Server configuration file. Defaults to hillview.toml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen port, overriding the configuration.
    #[arg(long)]
    pub port: Option<u16>,
}

impl Serve {
    /// Resolve the server configuration from the file and flags.
    pub fn config(&self) -> Result<ServerConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let mut config = ServerConfig::load_or_default(&path)?;
        if let Some(port) = self.port {
            config.server.port = port;
        }
        Ok(config)
    }

    /// Start the server and wait for ctrl-c.
    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        let handle = server::serve(&config).await?;
        eprintln!("serving on {}", handle.url());

        tokio::signal::ctrl_c().await?;
        tracing::info!("received ctrl-c, shutting down");
        handle.shutdown().await?;
        tracing::info!("server shut down");
        Ok(())
    }
}
