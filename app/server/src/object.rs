//! Server-side objects that RPC requests are invoked on.
//!
//! Objects live in the [`ObjectManager`] for the life of the server; methods
//! that derive a new object register it and reply with its id.

use compact_str::CompactString;
use futures_core::Stream;
use parking_lot::RwLock;
use protocol::RpcRequest;
use std::{collections::BTreeMap, pin::Pin, sync::Arc};

/// Replies of one request: each `Ok` is sent as a reply frame, an `Err` is
/// sent as an error reply and ends the stream.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, String>> + Send>>;

/// Why a request could not start.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// No object with that id.
    #[error("No such object {0}")]
    NoSuchObject(CompactString),
    /// The object has no such method.
    #[error("{object}: No such method {method}")]
    NoSuchMethod {
        /// Object id.
        object: CompactString,
        /// Requested method.
        method: CompactString,
    },
    /// Arguments did not match the method.
    #[error("Invalid arguments: {0}")]
    Arguments(#[from] serde_json::Error),
    /// Arguments parsed but make no sense.
    #[error("{0}")]
    Invalid(String),
}

/// An object that can execute RPC methods.
pub trait RpcTarget: Send + Sync {
    /// Start executing `method` with encoded `arguments`.
    fn execute(
        &self,
        method: &str,
        arguments: &str,
        objects: &ObjectManager,
    ) -> Result<ReplyStream, TargetError>;
}

/// Registry of live objects.
#[derive(Default)]
pub struct ObjectManager {
    objects: RwLock<BTreeMap<CompactString, Arc<dyn RpcTarget>>>,
}

impl ObjectManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` under a fixed id.
    pub fn insert(&self, id: impl Into<CompactString>, target: impl RpcTarget + 'static) {
        self.objects.write().insert(id.into(), Arc::new(target));
    }

    /// Register `target` under a fresh id and return the id.
    pub fn add(&self, target: impl RpcTarget + 'static) -> CompactString {
        let id = CompactString::new(ulid::Ulid::new().to_string());
        tracing::debug!("new object {id}");
        self.objects.write().insert(id.clone(), Arc::new(target));
        id
    }

    /// Look up an object.
    pub fn get(&self, id: &str) -> Option<Arc<dyn RpcTarget>> {
        self.objects.read().get(id).cloned()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether there are no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Dispatch a request to its target object.
    pub fn execute(&self, request: &RpcRequest) -> Result<ReplyStream, TargetError> {
        let target = self
            .get(&request.object_id)
            .ok_or_else(|| TargetError::NoSuchObject(request.object_id.clone()))?;
        target.execute(&request.method, &request.arguments, self)
    }
}
