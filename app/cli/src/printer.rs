//! Receiver that prints an operation's stream.

use client::{Operation, Receiver};
use serde_json::Value;
use std::{
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Outcome of a printed operation, readable after the stream ended.
#[derive(Debug, Clone, Default)]
pub struct Status {
    /// Target object.
    pub object: String,
    /// Invoked method.
    pub method: String,
    failed: Arc<AtomicBool>,
}

impl Status {
    /// Whether the receiver saw an error.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}

/// Prints results to `out`, errors to `err`, and the elapsed time once the
/// stream completes.
///
/// Partial results (`{"done": .., "data": ..}`) print with their percentage.
pub struct Printer<W, E> {
    operation: Operation,
    out: W,
    err: E,
    failed: Arc<AtomicBool>,
}

impl<W: Write, E: Write> Printer<W, E> {
    /// Printer for `operation`.
    pub fn new(operation: Operation, out: W, err: E) -> Self {
        Self {
            operation,
            out,
            err,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Status shared with this printer.
    pub fn status(&self) -> Status {
        Status {
            object: self.operation.target().to_owned(),
            method: self.operation.method().to_owned(),
            failed: Arc::clone(&self.failed),
        }
    }

    /// Give back the writers.
    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<W, E> Receiver<Value> for Printer<W, E>
where
    W: Write + Send,
    E: Write + Send,
{
    fn on_next(&mut self, value: Value) {
        let line = match (value.get("done").and_then(Value::as_f64), value.get("data")) {
            (Some(done), Some(data)) => format!("[{:5.1}%] {data}", done * 100.0),
            _ => value.to_string(),
        };
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::warn!("failed to print result: {e}");
        }
    }

    fn on_error(&mut self, message: String) {
        self.failed.store(true, Ordering::Release);
        if let Err(e) = writeln!(self.err, "error: {message}") {
            tracing::warn!("failed to print error: {e}");
        }
    }

    fn on_completed(&mut self) {
        let elapsed = self.operation.elapsed().unwrap_or_default();
        if let Err(e) = writeln!(self.out, "completed in {:.3}s", elapsed.as_secs_f64()) {
            tracing::warn!("failed to print completion: {e}");
        }
        let _ = self.out.flush();
    }
}
