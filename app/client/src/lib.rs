//! Hillview client library: streaming, cancellable RPC operations against
//! remote objects on a Hillview server.
//!
//! Build an [`RpcContext`], create [`Operation`]s from it (directly or through
//! a [`RemoteHandle`]), and invoke them with a [`Receiver`]. Every operation
//! gets its own WebSocket; replies stream back until the server closes it.

use compact_str::CompactString;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

pub use channel::{Channel, TransportEvent};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use handle::RemoteHandle;
pub use operation::{Arguments, Cancellable, Operation};
pub use progress::{ProgressBar, ProgressItem, ProgressTracker};
pub use protocol::PartialResult;
pub use receiver::{ErrorReporter, Event, OnComplete, Progress, Receiver, TracingReporter};

pub mod channel;
pub mod config;
mod connection;
pub mod error;
pub mod handle;
pub mod operation;
pub mod progress;
pub mod receiver;

/// Source of request ids: unique and strictly increasing.
#[derive(Debug, Default)]
pub struct RequestCounter {
    next: AtomicU64,
}

impl RequestCounter {
    /// Counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Everything operations need: configuration, the request-id counter, the
/// progress registry and the error reporter.
///
/// Cheap to clone; clones share the counter and the registry.
#[derive(Clone)]
pub struct RpcContext {
    config: Arc<ClientConfig>,
    counter: Arc<RequestCounter>,
    progress: ProgressTracker,
    reporter: Arc<dyn ErrorReporter>,
}

impl RpcContext {
    /// Create a context with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
            counter: Arc::new(RequestCounter::new()),
            progress: ProgressTracker::new(),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Access the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Set the server URL.
    pub fn server_url(mut self, url: impl Into<CompactString>) -> Self {
        Arc::make_mut(&mut self.config).server_url = url.into();
        self
    }

    /// Set the error reporter used by [`track`](Self::track).
    pub fn reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// The progress registry.
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// The initial remote object every session starts from.
    pub fn initial_object(&self) -> RemoteHandle {
        RemoteHandle::new(protocol::INITIAL_OBJECT_ID)
    }

    /// Create an operation invoking `method` on object `target`.
    pub fn create_operation(
        &self,
        target: impl Into<CompactString>,
        method: impl Into<CompactString>,
        args: Arguments,
    ) -> Operation {
        let operation = Operation::new(
            &self.config,
            self.counter.next_id(),
            target.into(),
            method.into(),
            args,
        );
        tracing::trace!(
            "created request {} for {}.{}",
            operation.request_id(),
            operation.target(),
            operation.method()
        );
        operation
    }

    /// Register `operation` with the progress registry and wrap `inner` so
    /// the bar follows its partial results.
    pub fn track<R>(
        &self,
        operation: &Operation,
        description: impl Into<CompactString>,
        inner: R,
    ) -> Progress<R> {
        self.reporter.clear();
        let bar = self.progress.register(operation.clone(), description);
        Progress::new(inner, bar, Arc::clone(&self.reporter))
    }
}

impl Default for RpcContext {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
