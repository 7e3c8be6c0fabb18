//! Demultiplexing of one operation's transport events to its receiver.
//!
//! [`Channel`] knows nothing about sockets: the connection driver feeds it
//! [`TransportEvent`]s in arrival order and it turns them into receiver
//! callbacks. Per operation the receiver sees zero or more `on_next` calls and
//! then one terminal path:
//!
//! - normal close (1000): `on_completed`
//! - any other close: `on_error(reason)` then `on_completed`
//! - server error, undecodable reply, or open failure: `on_error` alone; the
//!   close that follows dispatches nothing.

use crate::{operation::Operation, receiver::Receiver};
use protocol::{CloseReason, RpcReply, codec};
use serde::de::DeserializeOwned;
use std::{marker::PhantomData, time::Duration};

/// Something that happened on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport opened and the request went out.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The transport closed with the given code.
    Closed(u16),
    /// The transport never opened.
    OpenFailed(String),
    /// The server stayed silent longer than the reply timeout.
    TimedOut(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Open,
    /// An error was dispatched; waiting for the transport to go away.
    Failed,
    Closed,
}

/// Transport lifecycle of a single operation.
pub struct Channel<T, R> {
    request_id: u64,
    receiver: R,
    phase: Phase,
    operation: Option<Operation>,
    _payload: PhantomData<fn() -> T>,
}

impl<T, R> Channel<T, R>
where
    T: DeserializeOwned,
    R: Receiver<T>,
{
    /// Bind a receiver to the operation with the given request id.
    pub fn new(request_id: u64, receiver: R) -> Self {
        Self {
            request_id,
            receiver,
            phase: Phase::Connecting,
            operation: None,
            _payload: PhantomData,
        }
    }

    /// Mark `operation` closed the moment this channel turns terminal, so
    /// cancelling from inside a terminal callback is already a no-op.
    pub(crate) fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Whether the receiver already saw its terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Failed | Phase::Closed)
    }

    /// Whether the transport is open and the stream still running.
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    /// The bound receiver.
    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    /// Unbind and return the receiver.
    pub fn into_receiver(self) -> R {
        self.receiver
    }

    /// Process one transport event.
    pub fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if self.phase == Phase::Connecting {
                    self.enter(Phase::Open);
                }
            }
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Closed(code) => self.on_close(code),
            TransportEvent::OpenFailed(message) => {
                tracing::warn!("request {}: transport failed: {message}", self.request_id);
                self.fail(message);
            }
            TransportEvent::TimedOut(after) => {
                if self.is_terminal() {
                    return;
                }
                tracing::warn!("request {}: no reply within {after:?}", self.request_id);
                self.enter(Phase::Closed);
                self.receiver
                    .on_error(format!("No reply from server within {after:?}."));
                self.receiver.on_completed();
            }
        }
    }

    /// Dispatch an error as the terminal event, unless one already happened.
    pub(crate) fn fail(&mut self, message: String) {
        if self.is_terminal() {
            return;
        }
        self.enter(Phase::Failed);
        self.receiver.on_error(message);
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        if self.is_terminal() {
            if let Some(operation) = &self.operation {
                operation.mark_closed();
            }
        }
    }

    fn on_message(&mut self, text: &str) {
        if self.is_terminal() {
            tracing::warn!("request {}: reply after end of stream dropped", self.request_id);
            return;
        }
        tracing::debug!("request {}: reply received: {text}", self.request_id);

        let reply: RpcReply = match codec::decode(text) {
            Ok(reply) => reply,
            Err(e) => {
                self.fail(format!("Malformed reply: {e}"));
                return;
            }
        };
        if reply.request_id != self.request_id as i64 {
            tracing::warn!(
                "request {}: reply tagged with request {}",
                self.request_id,
                reply.request_id
            );
        }

        if reply.is_error {
            self.fail(reply.result);
            return;
        }
        match serde_json::from_str::<T>(&reply.result) {
            Ok(value) => self.receiver.on_next(value),
            Err(e) => self.fail(format!("Cannot decode reply: {e}")),
        }
    }

    fn on_close(&mut self, code: u16) {
        match self.phase {
            Phase::Closed => return,
            Phase::Failed => {
                tracing::debug!("request {}: closed with {code} after error", self.request_id);
                self.enter(Phase::Closed);
                return;
            }
            Phase::Connecting | Phase::Open => {}
        }

        self.enter(Phase::Closed);
        let reason = CloseReason::from_code(code);
        if reason.is_normal() {
            tracing::debug!("request {}: stream completed", self.request_id);
        } else {
            tracing::warn!("request {}: closed with {code}: {reason}", self.request_id);
            self.receiver.on_error(reason.to_string());
        }
        self.receiver.on_completed();
    }
}
