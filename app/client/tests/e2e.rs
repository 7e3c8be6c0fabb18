//! End-to-end tests against a live server on a free port.

use compact_str::CompactString;
use hillview_client::{
    Arguments, ClientConfig, Event, OnComplete, Operation, PartialResult, Receiver, RemoteHandle,
    RpcContext,
};
use serde_json::json;
use server::{ServeHandle, ServerConfig, config::ClusterConfig};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

async fn start() -> ServeHandle {
    let mut config = ServerConfig::default();
    config.server.port = 0;
    config.cluster = ClusterConfig {
        workers: vec!["worker1".into(), "worker2".into()],
    };
    server::serve(&config).await.unwrap()
}

fn drain<T>(rx: &mut UnboundedReceiver<Event<T>>) -> Vec<Event<T>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn ping_lists_workers() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());

    let op = ctx
        .initial_object()
        .operation(&ctx, "ping", Arguments::none());
    let (tx, mut rx) = unbounded_channel::<Event<Vec<String>>>();
    op.invoke(tx).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            Event::Next(vec!["worker1".to_string(), "worker2".to_string()]),
            Event::Completed,
        ]
    );
    assert!(op.is_closed());
    assert!(op.start_time().is_some());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn server_error_is_terminal() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());

    let args = Arguments::json(&json!({ "count": 0 })).unwrap();
    let op = ctx.create_operation("0", "loadNumbers", args);
    let (tx, mut rx) = unbounded_channel::<Event<PartialResult<String>>>();
    op.invoke(tx).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![Event::Error("count must be positive".to_string())]
    );
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_object_reports_error() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());

    let op = RemoteHandle::new("missing").operation(&ctx, "sum", Arguments::none());
    let (tx, mut rx) = unbounded_channel::<Event<PartialResult<i64>>>();
    op.invoke(tx).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![Event::Error("No such object missing".to_string())]
    );
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn chained_operations_share_start_time() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());

    let load = ctx.create_operation(
        "0",
        "loadNumbers",
        Arguments::json(&json!({ "count": 100 })).unwrap(),
    );
    let (tx, mut rx) = unbounded_channel::<Event<PartialResult<i64>>>();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();

    let next_ctx = ctx.clone();
    let previous = load.clone();
    let then = OnComplete::new(move |loaded: PartialResult<CompactString>| {
        let handle = RemoteHandle::new(loaded.data);
        let sum = handle.operation(
            &next_ctx,
            "sum",
            Arguments::json(&json!({ "chunks": 4 })).unwrap(),
        );
        sum.chain(&previous);
        let _ = done_tx.send(sum.clone());
        let tracked = next_ctx.track(&sum, "sum", tx);
        sum.invoke::<PartialResult<i64>, _>(tracked);
    });
    load.invoke(then).await.unwrap();

    let sum = done_rx.await.unwrap();
    assert_eq!(sum.start_time(), load.start_time());

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let last = events.len() - 1;
    assert_eq!(events[last], Event::Completed);
    assert_eq!(events[last - 1], Event::Next(PartialResult::new(1.0, 5050)));
    let positions: Vec<f64> = events[..last]
        .iter()
        .map(|event| match event {
            Event::Next(partial) => partial.done,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    assert!(ctx.progress().is_idle());
    // loadNumbers registered one derived object next to the initial one.
    assert_eq!(server.objects().len(), 2);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn cancel_mid_stream_closes_without_status() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());
    let numbers = server.objects().add(server::Numbers::new((1..=100).collect()));

    let op = ctx.create_operation(
        numbers,
        "sum",
        Arguments::json(&json!({ "chunks": 50, "delay_ms": 100 })).unwrap(),
    );
    let (tx, mut rx) = unbounded_channel::<Event<PartialResult<i64>>>();
    let join = op.invoke(tx);

    assert!(matches!(rx.recv().await, Some(Event::Next(_))));
    assert!(op.cancel());
    assert!(!op.cancel());
    join.await.unwrap();

    let tail: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|event| !matches!(event, Event::Next(_)))
        .collect();
    assert_eq!(
        tail,
        vec![Event::Error("No status code.".to_string()), Event::Completed]
    );
    assert!(op.is_closed());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn cancel_before_invoke() {
    let ctx = RpcContext::default().server_url("ws://127.0.0.1:9/rpc");
    let op = ctx.create_operation("0", "ping", Arguments::none());
    assert!(op.cancel());

    let (tx, mut rx) = unbounded_channel::<Event<serde_json::Value>>();
    op.invoke(tx).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![Event::Error("No status code.".to_string()), Event::Completed]
    );
}

#[tokio::test]
async fn unreachable_server_fails_once() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let ctx = RpcContext::default().server_url(format!("ws://127.0.0.1:{port}/rpc"));
    let op = ctx.create_operation("0", "ping", Arguments::none());

    let (tx, mut rx) = unbounded_channel::<Event<serde_json::Value>>();
    op.invoke(tx).await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Error(message) => assert!(message.starts_with("Error communicating to server")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!op.is_open());
    assert!(op.is_closed());
}

#[tokio::test]
async fn second_invoke_is_rejected() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());
    let op = ctx.create_operation("0", "ping", Arguments::none());

    let (tx, _rx) = unbounded_channel::<Event<Vec<String>>>();
    op.invoke(tx).await.unwrap();

    let (tx, mut rx) = unbounded_channel::<Event<Vec<String>>>();
    op.invoke(tx).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![Event::Error("Operation already invoked.".to_string())]
    );
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn silent_server_times_out() {
    let server = start().await;
    let ctx = RpcContext::new(ClientConfig {
        server_url: server.url().into(),
        reply_timeout_secs: Some(1),
    });
    let numbers = server.objects().add(server::Numbers::new(vec![1, 2, 3]));
    let op = ctx.create_operation(
        numbers,
        "sum",
        Arguments::json(&json!({ "chunks": 1, "delay_ms": 3000 })).unwrap(),
    );

    let (tx, mut rx) = unbounded_channel::<Event<PartialResult<i64>>>();
    tokio::time::timeout(Duration::from_secs(10), op.invoke(tx))
        .await
        .unwrap()
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::Error(m) if m.starts_with("No reply from server")));
    assert_eq!(events[1], Event::Completed);
    server.shutdown().await.unwrap();
}

/// Tries to cancel its own operation from the completion callback.
struct CancelWhenDone {
    operation: Operation,
    accepted: tokio::sync::mpsc::UnboundedSender<bool>,
}

impl Receiver<Vec<String>> for CancelWhenDone {
    fn on_next(&mut self, _: Vec<String>) {}

    fn on_error(&mut self, message: String) {
        panic!("unexpected error: {message}");
    }

    fn on_completed(&mut self) {
        let _ = self.accepted.send(self.operation.cancel());
    }
}

#[tokio::test]
async fn completed_operation_cannot_be_cancelled() {
    let server = start().await;
    let ctx = RpcContext::default().server_url(server.url());
    let op = ctx.create_operation("0", "ping", Arguments::none());

    let (accepted, mut rx) = unbounded_channel();
    let receiver = CancelWhenDone {
        operation: op.clone(),
        accepted,
    };
    op.invoke(receiver).await.unwrap();

    assert_eq!(rx.recv().await, Some(false));
    assert!(!op.cancel());
    assert!(!op.is_cancelled());
    assert!(op.is_closed());

    let bar = ctx.progress().register(op.clone(), "ping");
    assert!(!bar.cancel());
    server.shutdown().await.unwrap();
}

/// One-shot server that answers the request with a single binary frame.
async fn binary_server(payload: Vec<u8>) -> String {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _request = ws.next().await;
        let _ = ws.send(Message::Binary(payload.into())).await;
        while let Some(Ok(_)) = ws.next().await {}
    });
    format!("ws://{addr}/rpc")
}

#[tokio::test]
async fn non_utf8_binary_frame_is_invalid_payload() {
    let url = binary_server(vec![0xff, 0xfe, 0xfd]).await;
    let ctx = RpcContext::default().server_url(url);
    let op = ctx.create_operation("0", "ping", Arguments::none());

    let (tx, mut rx) = unbounded_channel::<Event<Vec<String>>>();
    tokio::time::timeout(Duration::from_secs(10), op.invoke(tx))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            Event::Error("Incorrect message type.".to_string()),
            Event::Completed,
        ]
    );
}

#[tokio::test]
async fn utf8_binary_frame_is_a_reply() {
    let reply = protocol::RpcReply {
        result: r#"["solo"]"#.to_string(),
        request_id: 0,
        is_error: false,
    };
    let url = binary_server(serde_json::to_vec(&reply).unwrap()).await;
    let ctx = RpcContext::default().server_url(url);
    let op = ctx.create_operation("0", "ping", Arguments::none());

    let (tx, mut rx) = unbounded_channel::<Event<Vec<String>>>();
    let join = op.invoke(tx);
    assert_eq!(rx.recv().await, Some(Event::Next(vec!["solo".to_string()])));
    op.cancel();
    join.await.unwrap();
}
