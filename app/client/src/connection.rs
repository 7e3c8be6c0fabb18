//! WebSocket driver: one connection per operation.
//!
//! Opens the socket, sends the request once, and translates socket activity
//! into [`TransportEvent`]s for the operation's [`Channel`]. Cancellation and
//! the optional reply timeout close the socket from this side.

use crate::{
    channel::{Channel, TransportEvent},
    operation::Operation,
    receiver::Receiver,
};
use futures_util::{SinkExt, StreamExt};
use protocol::close;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{Error as WsError, Message, error::ProtocolError},
};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Run `operation` to its terminal event.
pub(crate) async fn drive<T, R>(operation: Operation, mut channel: Channel<T, R>)
where
    T: DeserializeOwned,
    R: Receiver<T>,
{
    let id = operation.request_id();
    let url = operation.server_url().to_owned();

    let connect = tokio_tungstenite::connect_async(url.as_str());
    let mut socket = tokio::select! {
        biased;
        _ = operation.cancelled() => {
            tracing::debug!("request {id}: cancelled before the socket opened");
            channel.handle(TransportEvent::Closed(close::NO_STATUS));
            operation.mark_closed();
            return;
        }
        connected = connect => match connected {
            Ok((socket, _)) => socket,
            Err(e) => {
                channel.handle(TransportEvent::OpenFailed(format!(
                    "Error communicating to server: {e}"
                )));
                operation.mark_closed();
                return;
            }
        },
    };
    tracing::debug!("request {id}: connected to {url}");

    if let Err(event) = send_request(&operation, &mut socket).await {
        channel.handle(event);
        operation.mark_closed();
        return;
    }
    operation.mark_open();
    channel.handle(TransportEvent::Opened);

    let timeout = operation.reply_timeout();
    loop {
        let frame = tokio::select! {
            biased;
            _ = operation.cancelled() => {
                tracing::debug!("request {id}: cancelled");
                let _ = socket.close(None).await;
                channel.handle(TransportEvent::Closed(close::NO_STATUS));
                break;
            }
            _ = silence(timeout) => {
                let _ = socket.close(None).await;
                // `silence` only resolves when a timeout is set.
                channel.handle(TransportEvent::TimedOut(timeout.unwrap_or_default()));
                break;
            }
            frame = socket.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                channel.handle(TransportEvent::Message(text.as_str().to_owned()));
            }
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => channel.handle(TransportEvent::Message(text.to_owned())),
                Err(e) => {
                    tracing::warn!("request {id}: binary frame is not UTF-8: {e}");
                    channel.handle(TransportEvent::Closed(close::INVALID_PAYLOAD));
                }
            },
            Some(Ok(Message::Close(frame))) => {
                let code = frame
                    .map(|frame| u16::from(frame.code))
                    .unwrap_or(close::NO_STATUS);
                channel.handle(TransportEvent::Closed(code));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!("request {id}: socket error: {e}");
                channel.handle(TransportEvent::Closed(close_code(&e)));
                break;
            }
            None => {
                channel.handle(TransportEvent::Closed(close::ABNORMAL));
                break;
            }
        }

        if channel.is_terminal() {
            // Also completes the closing handshake after a server close.
            let _ = socket.close(None).await;
            break;
        }
    }
    operation.mark_closed();
}

/// Send the serialized request, exactly once.
async fn send_request(operation: &Operation, socket: &mut Socket) -> Result<(), TransportEvent> {
    let text = match operation.serialize() {
        Ok(text) => text,
        Err(e) => {
            let _ = socket.close(None).await;
            return Err(TransportEvent::OpenFailed(e.to_string()));
        }
    };
    tracing::debug!("sending request {text}");
    socket.send(Message::Text(text.into())).await.map_err(|e| {
        tracing::warn!("request {}: send failed: {e}", operation.request_id());
        TransportEvent::Closed(close_code(&e))
    })
}

/// Resolves after `timeout` of silence; never without a timeout.
async fn silence(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

/// Closure code equivalent to a transport error.
fn close_code(error: &WsError) -> u16 {
    match error {
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => close::ABNORMAL,
        WsError::Protocol(_) => close::PROTOCOL_ERROR,
        WsError::Capacity(_) => close::TOO_LARGE,
        WsError::Utf8 { .. } => close::INVALID_PAYLOAD,
        _ => close::ABNORMAL,
    }
}
