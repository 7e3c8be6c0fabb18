//! Text-frame codec for the WebSocket transport.
//!
//! Wire format: one JSON document per WebSocket text frame. Frames larger than
//! [`MAX_MESSAGE_SIZE`] are rejected on both ends.

use serde::{Serialize, de::DeserializeOwned};

/// Maximum frame size: 16 MiB.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame exceeds the maximum allowed size.
    #[error("frame too large: {size} bytes (max {MAX_MESSAGE_SIZE})")]
    TooLarge { size: usize },
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a typed message as a text frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, CodecError> {
    let text = serde_json::to_string(msg)?;
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge { size: text.len() });
    }
    Ok(text)
}

/// Decode a text frame into a typed message.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge { size: text.len() });
    }
    Ok(serde_json::from_str(text)?)
}
