//! Operation construction, serialization and chaining tests.

use hillview_client::{Arguments, Cancellable, RpcContext};
use protocol::RpcRequest;
use serde::Serialize;
use std::time::{Duration, Instant};

#[test]
fn request_ids_strictly_increase() {
    let ctx = RpcContext::default();
    let ids: Vec<u64> = (0..50)
        .map(|_| ctx.create_operation("0", "ping", Arguments::none()).request_id())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn contexts_do_not_share_counters() {
    let a = RpcContext::default();
    let b = RpcContext::default();
    let first = a.create_operation("0", "ping", Arguments::none());
    let second = b.create_operation("0", "ping", Arguments::none());
    assert_eq!(first.request_id(), second.request_id());

    let cloned = a.clone();
    let third = cloned.create_operation("0", "ping", Arguments::none());
    assert!(third.request_id() > first.request_id());
}

#[derive(Serialize)]
struct HistogramArgs {
    column: String,
    buckets: u32,
}

#[test]
fn serialized_envelope_recovers_request() {
    let ctx = RpcContext::default();
    let args = HistogramArgs {
        column: "delay".into(),
        buckets: 20,
    };
    let op = ctx.create_operation("42", "histogram", Arguments::json(&args).unwrap());

    let text = op.serialize().unwrap();
    let request: RpcRequest = serde_json::from_str(&text).unwrap();
    assert_eq!(request.object_id, "42");
    assert_eq!(request.method, "histogram");
    assert_eq!(request.request_id, op.request_id());
    assert_eq!(request.proto_version, protocol::PROTOCOL_VERSION);

    let decoded: serde_json::Value = serde_json::from_str(&request.arguments).unwrap();
    assert_eq!(decoded, serde_json::json!({"column": "delay", "buckets": 20}));
}

#[test]
fn raw_arguments_pass_through() {
    let ctx = RpcContext::default();
    let op = ctx.create_operation("1", "filter", Arguments::raw("{\"kind\":\"custom\"}"));
    let request: RpcRequest = serde_json::from_str(&op.serialize().unwrap()).unwrap();
    assert_eq!(request.arguments, "{\"kind\":\"custom\"}");
}

#[test]
fn chained_operation_inherits_start() {
    let ctx = RpcContext::default();
    let first = ctx.create_operation("0", "loadNumbers", Arguments::none());
    let t0 = Instant::now() - Duration::from_secs(10);
    first.set_start_time(t0);

    let second = ctx.create_operation("1", "sum", Arguments::none());
    assert!(second.start_time().is_none());
    second.chain(&first);
    assert_eq!(second.start_time(), Some(t0));
    assert!(second.elapsed().unwrap() >= Duration::from_secs(10));
}

#[test]
fn chaining_an_unstarted_operation_is_a_no_op() {
    let ctx = RpcContext::default();
    let first = ctx.create_operation("0", "ping", Arguments::none());
    let second = ctx.create_operation("0", "ping", Arguments::none());
    second.chain(&first);
    assert!(second.start_time().is_none());
}

#[test]
fn cancel_through_trait_object() {
    let ctx = RpcContext::default();
    let op = ctx.create_operation("0", "ping", Arguments::none());
    let cancellable: &dyn Cancellable = &op;
    assert!(cancellable.cancel());
    assert!(!cancellable.cancel());
    assert!(op.is_closed());
}
