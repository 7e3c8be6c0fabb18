//! A single logical call against a remote object.

use crate::{
    channel::Channel,
    config::ClientConfig,
    connection,
    error::Result,
    receiver::Receiver,
};
use compact_str::CompactString;
use parking_lot::Mutex;
use protocol::{PROTOCOL_VERSION, RpcRequest, codec};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::Notify, task::JoinHandle};

/// Something the user can stop, with the time it started.
///
/// Progress bars and chains only see operations through this trait.
pub trait Cancellable: Send + Sync {
    /// Request cancellation. Returns `false` if there was nothing to cancel.
    fn cancel(&self) -> bool;

    /// Start of the (possibly multi-step) computation, if it started.
    fn start_time(&self) -> Option<Instant>;
}

/// Argument payload of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// Generic JSON encoding.
    Json(serde_json::Value),
    /// Pre-encoded representation, sent verbatim.
    Raw(String),
}

impl Arguments {
    /// No arguments; encoded as JSON `null`.
    pub fn none() -> Self {
        Self::Json(serde_json::Value::Null)
    }

    /// Encode any serializable value as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Use a custom wire representation as is.
    pub fn raw(encoded: impl Into<String>) -> Self {
        Self::Raw(encoded.into())
    }

    /// The string placed in the request's `arguments` field.
    pub fn encode(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Raw(encoded) => encoded.clone(),
        }
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Default)]
struct State {
    start_time: Option<Instant>,
    invoked: bool,
    opened: bool,
    cancelled: bool,
    closed: bool,
}

#[derive(Debug)]
struct Inner {
    target: CompactString,
    method: CompactString,
    args: Arguments,
    request_id: u64,
    server_url: CompactString,
    reply_timeout: Option<Duration>,
    state: Mutex<State>,
    cancel: Notify,
}

/// One streaming RPC.
///
/// Cloning yields another handle to the same operation, so a progress bar
/// can hold one to cancel it while the channel task holds another.
#[derive(Debug, Clone)]
pub struct Operation {
    inner: Arc<Inner>,
}

impl Operation {
    pub(crate) fn new(
        config: &ClientConfig,
        request_id: u64,
        target: CompactString,
        method: CompactString,
        args: Arguments,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                target,
                method,
                args,
                request_id,
                server_url: config.server_url.clone(),
                reply_timeout: config.reply_timeout(),
                state: Mutex::new(State::default()),
                cancel: Notify::new(),
            }),
        }
    }

    /// Id of the remote object this operation targets.
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    /// Method name.
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Argument payload.
    pub fn arguments(&self) -> &Arguments {
        &self.inner.args
    }

    /// Process-wide unique request id.
    pub fn request_id(&self) -> u64 {
        self.inner.request_id
    }

    /// Endpoint the operation connects to.
    pub fn server_url(&self) -> &str {
        &self.inner.server_url
    }

    pub(crate) fn reply_timeout(&self) -> Option<Duration> {
        self.inner.reply_timeout
    }

    /// The request envelope.
    pub fn request(&self) -> RpcRequest {
        RpcRequest {
            object_id: self.inner.target.clone(),
            method: self.inner.method.clone(),
            arguments: self.inner.args.encode(),
            request_id: self.inner.request_id,
            proto_version: PROTOCOL_VERSION,
        }
    }

    /// Encode the request envelope for the wire.
    pub fn serialize(&self) -> Result<String> {
        Ok(codec::encode(&self.request())?)
    }

    /// Sever the channel.
    ///
    /// Returns `false`, and does nothing, if the operation already closed or
    /// was cancelled before.
    pub fn cancel(&self) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.closed || state.cancelled {
                return false;
            }
            state.cancelled = true;
            state.closed = true;
        }
        tracing::debug!("cancelling request {}", self.inner.request_id);
        self.inner.cancel.notify_one();
        true
    }

    /// Start of the operation, or of the chain it continues.
    ///
    /// `None` until the operation is invoked or chained.
    pub fn start_time(&self) -> Option<Instant> {
        self.inner.state.lock().start_time
    }

    /// Override the start time, e.g. to measure a whole pipeline.
    pub fn set_start_time(&self, start: Instant) {
        self.inner.state.lock().start_time = Some(start);
    }

    /// Mark this operation as a continuation of `previous`.
    ///
    /// Inherits the start time of `previous` unless one is already set, so
    /// elapsed time covers the whole chain.
    pub fn chain(&self, previous: &dyn Cancellable) {
        let Some(start) = previous.start_time() else {
            return;
        };
        let mut state = self.inner.state.lock();
        if state.start_time.is_none() {
            state.start_time = Some(start);
        }
    }

    /// Time since the operation (or its chain) started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time().map(|start| start.elapsed())
    }

    /// Whether the transport is currently open.
    pub fn is_open(&self) -> bool {
        let state = self.inner.state.lock();
        state.opened && !state.closed
    }

    /// Whether the operation reached its end, or was cancelled.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().cancelled
    }

    /// Run the operation, delivering replies to `receiver`.
    ///
    /// Returns immediately; the channel runs as a task on the current tokio
    /// runtime. The returned handle resolves once the receiver has seen its
    /// terminal event. An operation runs at most once: invoking it again
    /// reports an error to the new receiver.
    pub fn invoke<T, R>(&self, receiver: R) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        R: Receiver<T> + 'static,
    {
        let first = {
            let mut state = self.inner.state.lock();
            let first = !state.invoked;
            state.invoked = true;
            if first && state.start_time.is_none() {
                state.start_time = Some(Instant::now());
            }
            first
        };

        let channel = Channel::new(self.request_id(), receiver);
        let operation = self.clone();
        tokio::spawn(async move {
            if first {
                let channel = channel.with_operation(operation.clone());
                connection::drive(operation, channel).await;
            } else {
                tracing::warn!("request {} invoked twice", operation.request_id());
                let mut channel = channel;
                channel.fail("Operation already invoked.".to_owned());
            }
        })
    }

    pub(crate) fn mark_open(&self) {
        self.inner.state.lock().opened = true;
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.state.lock().closed = true;
    }

    /// Resolves once cancellation was requested.
    pub(crate) async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.cancel.notified().await;
    }
}

impl Cancellable for Operation {
    fn cancel(&self) -> bool {
        self.cancel()
    }

    fn start_time(&self) -> Option<Instant> {
        self.start_time()
    }
}
