//! Consumers of operation results.
//!
//! Anything that wants replies implements [`Receiver`]. Shared behavior is
//! layered on by wrapping instead of inheriting: [`Progress`] adds progress
//! bookkeeping and error reporting around any receiver of partial results.

use crate::progress::ProgressBar;
use protocol::PartialResult;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The three callbacks an operation's consumer sees.
///
/// Callbacks for one operation run in order on the operation's channel task.
pub trait Receiver<T>: Send {
    /// A (partial) result arrived.
    fn on_next(&mut self, value: T);

    /// The operation failed; `message` is human readable.
    fn on_error(&mut self, message: String);

    /// The stream ended.
    fn on_completed(&mut self) {}
}

impl<T, R: Receiver<T> + ?Sized> Receiver<T> for Box<R> {
    fn on_next(&mut self, value: T) {
        (**self).on_next(value)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }

    fn on_completed(&mut self) {
        (**self).on_completed()
    }
}

/// A receiver callback, as forwarded over a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    /// `on_next`.
    Next(T),
    /// `on_error`.
    Error(String),
    /// `on_completed`.
    Completed,
}

/// Forward callbacks to async code. Events sent after the consumer went away
/// are dropped.
impl<T: Send> Receiver<T> for mpsc::UnboundedSender<Event<T>> {
    fn on_next(&mut self, value: T) {
        let _ = self.send(Event::Next(value));
    }

    fn on_error(&mut self, message: String) {
        let _ = self.send(Event::Error(message));
    }

    fn on_completed(&mut self) {
        let _ = self.send(Event::Completed);
    }
}

/// Keeps the last value and hands it to a continuation once the stream
/// completes successfully.
///
/// This is how dependent operations are sequenced: the continuation builds
/// and invokes the next step. After an error the continuation never runs.
pub struct OnComplete<T, F> {
    last: Option<T>,
    then: Option<F>,
}

impl<T, F> OnComplete<T, F>
where
    F: FnOnce(T),
{
    /// Run `then` with the last value on completion.
    pub fn new(then: F) -> Self {
        Self {
            last: None,
            then: Some(then),
        }
    }
}

impl<T, F> Receiver<T> for OnComplete<T, F>
where
    T: Send,
    F: FnOnce(T) + Send,
{
    fn on_next(&mut self, value: T) {
        self.last = Some(value);
    }

    fn on_error(&mut self, message: String) {
        tracing::debug!("continuation dropped: {message}");
        self.then = None;
    }

    fn on_completed(&mut self) {
        match (self.then.take(), self.last.take()) {
            (Some(then), Some(value)) => then(value),
            (Some(_), None) => tracing::warn!("stream completed without a value"),
            _ => {}
        }
    }
}

/// Sink for user-visible error messages.
pub trait ErrorReporter: Send + Sync {
    /// Show an error.
    fn report_error(&self, message: &str);

    /// Clear previously shown errors.
    fn clear(&self) {}
}

/// Reports errors to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Wraps a receiver of partial results with progress bookkeeping.
///
/// Partial results move the bar to their `done` fraction; errors go to the
/// reporter; either terminal path finishes (and unregisters) the bar. The
/// wrapped receiver sees every callback.
pub struct Progress<R> {
    inner: R,
    bar: ProgressBar,
    reporter: Arc<dyn ErrorReporter>,
}

impl<R> Progress<R> {
    /// Wrap `inner`, reporting progress on `bar`.
    pub fn new(inner: R, bar: ProgressBar, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            inner,
            bar,
            reporter,
        }
    }

    /// The progress bar driven by this receiver.
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// The wrapped receiver.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<T, R> Receiver<PartialResult<T>> for Progress<R>
where
    T: Send,
    R: Receiver<PartialResult<T>>,
{
    fn on_next(&mut self, value: PartialResult<T>) {
        self.bar.set_position(value.done);
        self.inner.on_next(value);
    }

    fn on_error(&mut self, message: String) {
        self.reporter.report_error(&message);
        self.inner.on_error(message);
        self.bar.set_finished();
    }

    fn on_completed(&mut self) {
        self.inner.on_completed();
        self.bar.set_finished();
    }
}
