//! Hillview RPC server: a WebSocket endpoint dispatching streaming requests
//! to server-side objects.

pub mod config;
pub mod object;
pub mod serve;
pub mod targets;
pub mod ws;

pub use config::ServerConfig;
pub use object::{ObjectManager, ReplyStream, RpcTarget, TargetError};
pub use serve::{ServeHandle, serve, serve_on};
pub use targets::{InitialObject, MAX_NUMBERS, Numbers};
