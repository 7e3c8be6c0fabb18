//! Client error type.

use protocol::codec::CodecError;

/// Errors raised while building or configuring operations.
///
/// Failures of an operation in flight are never returned as errors; they are
/// delivered to the operation's receiver.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Arguments could not be encoded.
    #[error("cannot encode arguments: {0}")]
    Arguments(#[from] serde_json::Error),
    /// The request envelope could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Configuration file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
