//! Server configuration loaded from TOML.

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "hillview.toml";

/// Top-level server configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener configuration.
    #[serde(default)]
    pub server: ListenConfig,
    /// Cluster description reported by the initial object.
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// Where the RPC endpoint listens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Bind host.
    pub host: CompactString,
    /// Bind port; 0 picks a free port.
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Worker machines backing the service.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Worker addresses, as reported by `ping`.
    pub workers: Vec<CompactString>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            workers: vec!["127.0.0.1:3569".into()],
        }
    }
}

impl ServerConfig {
    /// Parse a TOML string, expanding `${VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = protocol::env::expand_env_vars(toml_str);
        let config: Self = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("no {} found, using defaults", path.display());
            return Ok(Self::default());
        }
        let config =
            Self::load(path).with_context(|| format!("failed to load {}", path.display()))?;
        tracing::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
