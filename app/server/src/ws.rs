//! WebSocket RPC endpoint: axum upgrade handler and reply loop.
//!
//! One request per connection: the first text frame is the request, every
//! streamed result becomes a reply frame, and the server closes the socket
//! with a normal closure when the stream ends. If the client closes first,
//! the reply stream is dropped, which cancels the computation.

use crate::object::ObjectManager;
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{CloseFrame, Message as WsMessage, WebSocket, close_code},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use protocol::{PROTOCOL_VERSION, RPC_PATH, RpcReply, RpcRequest, codec};
use std::sync::Arc;

type Sender = SplitSink<WebSocket, WsMessage>;

/// Build the axum router with the RPC endpoint.
pub fn router(objects: Arc<ObjectManager>) -> Router {
    Router::new()
        .route(RPC_PATH, get(rpc_handler))
        .with_state(objects)
}

/// WebSocket upgrade handler.
async fn rpc_handler(
    State(objects): State<Arc<ObjectManager>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(codec::MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, objects))
}

/// Serve one request on an established connection.
async fn handle_socket(socket: WebSocket, objects: Arc<ObjectManager>) {
    let (mut sender, mut receiver) = socket.split();

    let request: RpcRequest = loop {
        let text = match receiver.next().await {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => continue,
        };
        match codec::decode(text.as_str()) {
            Ok(request) => break request,
            Err(e) => {
                tracing::error!("error processing request: {e}");
                let reply = RpcReply::uncorrelated_error(format!("Invalid request: {e}"));
                let _ = send_reply(&mut sender, &reply).await;
                close(&mut sender).await;
                return;
            }
        }
    };

    let id = request.request_id;
    tracing::info!(
        "executing request {id}: {}.{}",
        request.object_id,
        request.method
    );
    if request.proto_version != PROTOCOL_VERSION {
        tracing::warn!(
            "request {id} speaks protocol {}, server speaks {PROTOCOL_VERSION}",
            request.proto_version
        );
    }

    let mut replies = match objects.execute(&request) {
        Ok(replies) => replies,
        Err(e) => {
            tracing::warn!("request {id} failed: {e}");
            let _ = send_reply(&mut sender, &request.error(e.to_string())).await;
            close(&mut sender).await;
            return;
        }
    };

    loop {
        tokio::select! {
            item = replies.next() => match item {
                Some(Ok(value)) => {
                    if send_reply(&mut sender, &request.reply(value.to_string())).await.is_err() {
                        tracing::info!("request {id}: client went away");
                        return;
                    }
                }
                Some(Err(message)) => {
                    tracing::warn!("request {id} failed: {message}");
                    let _ = send_reply(&mut sender, &request.error(message)).await;
                    break;
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(_))) => {
                    let reply = request.error("Session already associated with a request!");
                    let _ = send_reply(&mut sender, &reply).await;
                    break;
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => {
                    tracing::info!("request {id}: closed by client, cancelling");
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("request {id} completed");
    close(&mut sender).await;
}

async fn send_reply(sender: &mut Sender, reply: &RpcReply) -> Result<(), axum::Error> {
    let text = match codec::encode(reply) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("failed to serialize reply: {e}");
            codec::encode(&RpcReply {
                result: e.to_string(),
                request_id: reply.request_id,
                is_error: true,
            })
            .map_err(axum::Error::new)?
        }
    };
    sender.send(WsMessage::Text(text.into())).await
}

/// End the stream with a normal closure.
async fn close(sender: &mut Sender) {
    let frame = CloseFrame {
        code: close_code::NORMAL,
        reason: "".into(),
    };
    if let Err(e) = sender.send(WsMessage::Close(Some(frame))).await {
        tracing::debug!("close failed: {e}");
    }
}
