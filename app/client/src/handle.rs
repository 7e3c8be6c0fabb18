//! Handles to server-side objects.

use crate::{
    RpcContext,
    operation::{Arguments, Operation},
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an object living on the server.
///
/// New handles come out of replies: methods that derive an object answer
/// with its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteHandle {
    id: CompactString,
}

impl RemoteHandle {
    /// Refer to the object with the given id.
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self { id: id.into() }
    }

    /// Server-side object id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Create an operation invoking `method` on this object.
    pub fn operation(
        &self,
        ctx: &RpcContext,
        method: impl Into<CompactString>,
        args: Arguments,
    ) -> Operation {
        ctx.create_operation(self.id.clone(), method, args)
    }
}

impl From<&str> for RemoteHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RemoteHandle {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
