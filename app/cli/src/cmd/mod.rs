//! CLI argument parsing and subcommand dispatch.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client::{ClientConfig, RpcContext};
use std::path::PathBuf;

pub mod call;
pub mod ping;
pub mod serve;

/// Hillview RPC client and server.
#[derive(Parser, Debug)]
#[command(name = "hillview", about = "Hillview RPC client and server")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the RPC server until ctrl-c.
    Serve(serve::Serve),
    /// Ask the server for its workers.
    Ping(ping::Ping),
    /// Invoke a method on a remote object and print its results.
    Call(call::Call),
}

impl Cli {
    /// Run the selected subcommand.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve(cmd) => cmd.run().await,
            Command::Ping(cmd) => cmd.run().await,
            Command::Call(cmd) => cmd.run().await,
        }
    }
}

/// Connection options shared by the client subcommands.
#[derive(Args, Debug, Default)]
pub struct Connect {
    /// RPC endpoint, e.g. ws://127.0.0.1:8080/rpc.
    #[arg(long)]
    pub url: Option<String>,

    /// Client configuration file (TOML).
    #[arg(long = "client-config")]
    pub config: Option<PathBuf>,

    /// Give up when the server stays silent this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Connect {
    /// Resolve the client configuration: file first, then flags.
    pub fn config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.url {
            config.server_url = url.as_str().into();
        }
        if self.timeout.is_some() {
            config.reply_timeout_secs = self.timeout;
        }
        Ok(config)
    }

    /// Build an RPC context from the resolved configuration.
    pub fn context(&self) -> Result<RpcContext> {
        Ok(RpcContext::new(self.config()?))
    }
}
