//! Client configuration loaded from TOML.

use crate::error::Result;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Default RPC endpoint of a local server.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080/rpc";

/// Client configuration for talking to an RPC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the RPC endpoint.
    pub server_url: CompactString,
    /// Give up on an operation when the server stays silent this long.
    /// `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: CompactString::from(DEFAULT_SERVER_URL),
            reply_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Parse a TOML string, expanding `${VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = protocol::env::expand_env_vars(toml_str);
        Ok(toml::from_str(&expanded)?)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Liveness timeout for replies, if configured.
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_secs.map(Duration::from_secs)
    }
}
