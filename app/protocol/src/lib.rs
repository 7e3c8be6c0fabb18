//! Hillview wire protocol types shared between the RPC server and its clients.
//!
//! Every operation travels over its own WebSocket: the client sends exactly one
//! [`RpcRequest`] right after the socket opens, the server answers with zero or
//! more [`RpcReply`] frames and then closes the socket. The close code tells the
//! client whether the stream ended normally (see [`close`]).

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

pub use close::CloseReason;

pub mod close;
pub mod codec;
pub mod env;

/// Current protocol version, sent with every request.
pub const PROTOCOL_VERSION: u32 = 6;

/// Path of the RPC WebSocket endpoint on the server.
pub const RPC_PATH: &str = "/rpc";

/// Object id of the initial remote object every session starts from.
pub const INITIAL_OBJECT_ID: &str = "0";

/// Request id used by the server when it cannot tell which request a reply
/// belongs to (e.g. the request did not parse).
pub const UNKNOWN_REQUEST_ID: i64 = -1;

/// Request sent by the client, one per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    /// Id of the server-side object the method is invoked on.
    pub object_id: CompactString,
    /// Method name.
    pub method: CompactString,
    /// Argument payload, already encoded (usually JSON).
    pub arguments: String,
    /// Process-wide unique, increasing request id.
    pub request_id: u64,
    /// Protocol version spoken by the client.
    pub proto_version: u32,
}

impl RpcRequest {
    /// Build a successful reply to this request carrying an encoded payload.
    pub fn reply(&self, result: impl Into<String>) -> RpcReply {
        RpcReply {
            result: result.into(),
            request_id: self.request_id as i64,
            is_error: false,
        }
    }

    /// Build an error reply to this request.
    pub fn error(&self, message: impl Into<String>) -> RpcReply {
        RpcReply {
            result: message.into(),
            request_id: self.request_id as i64,
            is_error: true,
        }
    }
}

/// Reply frame sent by the server, zero or more per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReply {
    /// JSON payload on success, human-readable text on error.
    pub result: String,
    /// Id of the request being answered.
    pub request_id: i64,
    /// Whether `result` is an error message.
    pub is_error: bool,
}

impl RpcReply {
    /// Error reply that cannot be correlated with a request.
    pub fn uncorrelated_error(message: impl Into<String>) -> Self {
        Self {
            result: message.into(),
            request_id: UNKNOWN_REQUEST_ID,
            is_error: true,
        }
    }
}

/// A streamed, possibly incomplete result.
///
/// `done` is the fraction of the work completed so far, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult<T> {
    /// Fraction of the computation completed.
    pub done: f64,
    /// Payload accumulated so far; may be null for pure progress updates.
    pub data: T,
}

impl<T> PartialResult<T> {
    /// Create a partial result.
    pub fn new(done: f64, data: T) -> Self {
        Self { done, data }
    }
}
