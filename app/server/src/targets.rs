//! Built-in objects: the initial object and in-memory number sets.

use crate::object::{ObjectManager, ReplyStream, RpcTarget, TargetError};
use compact_str::CompactString;
use protocol::PartialResult;
use serde::Deserialize;
use std::time::Duration;

/// Largest set `loadNumbers` will create.
pub const MAX_NUMBERS: u64 = 10_000_000;

/// Entry point of every session, registered under id `"0"`.
pub struct InitialObject {
    workers: Vec<CompactString>,
}

impl InitialObject {
    /// Initial object for a cluster of `workers`.
    pub fn new(workers: Vec<CompactString>) -> Self {
        Self { workers }
    }
}

#[derive(Deserialize)]
struct LoadNumbers {
    count: u64,
}

impl RpcTarget for InitialObject {
    fn execute(
        &self,
        method: &str,
        arguments: &str,
        objects: &ObjectManager,
    ) -> Result<ReplyStream, TargetError> {
        match method {
            "ping" => {
                let workers = serde_json::to_value(&self.workers)?;
                Ok(single(workers))
            }
            "loadNumbers" => {
                let args: LoadNumbers = serde_json::from_str(arguments)?;
                if args.count == 0 {
                    return Err(TargetError::Invalid("count must be positive".into()));
                }
                let count = i64::try_from(args.count)
                    .ok()
                    .filter(|_| args.count <= MAX_NUMBERS)
                    .ok_or_else(|| {
                        TargetError::Invalid(format!("count must be at most {MAX_NUMBERS}"))
                    })?;
                let values = (1..=count).collect();
                let id = objects.add(Numbers::new(values));
                Ok(single(serde_json::to_value(PartialResult::new(1.0, id))?))
            }
            other => Err(TargetError::NoSuchMethod {
                object: protocol::INITIAL_OBJECT_ID.into(),
                method: other.into(),
            }),
        }
    }
}

/// An in-memory set of numbers.
pub struct Numbers {
    values: Vec<i64>,
}

impl Numbers {
    /// Wrap `values`.
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Sum {
    /// Number of partial results to stream.
    chunks: Option<usize>,
    /// Pause between partial results.
    delay_ms: Option<u64>,
}

impl RpcTarget for Numbers {
    fn execute(
        &self,
        method: &str,
        arguments: &str,
        _objects: &ObjectManager,
    ) -> Result<ReplyStream, TargetError> {
        match method {
            "sum" => {
                let args: Option<Sum> = serde_json::from_str(arguments)?;
                let args = args.unwrap_or_default();
                let chunks = args.chunks.unwrap_or(4).clamp(1, self.values.len().max(1));
                let delay = Duration::from_millis(args.delay_ms.unwrap_or(0));
                Ok(running_sums(self.values.clone(), chunks, delay))
            }
            "count" => Ok(single(self.values.len().into())),
            other => Err(TargetError::NoSuchMethod {
                object: "numbers".into(),
                method: other.into(),
            }),
        }
    }
}

fn single(value: serde_json::Value) -> ReplyStream {
    Box::pin(futures_util::stream::once(async move { Ok(value) }))
}

/// Stream the running sum of `values` in `chunks` steps.
fn running_sums(values: Vec<i64>, chunks: usize, delay: Duration) -> ReplyStream {
    Box::pin(async_stream::stream! {
        let size = values.len().div_ceil(chunks).max(1);
        let total = values.len().max(1);
        let mut sum = 0i64;
        let mut seen = 0usize;
        for chunk in values.chunks(size) {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let Some(next) = chunk.iter().try_fold(sum, |acc, v| acc.checked_add(*v)) else {
                yield Err("sum overflows a 64-bit integer".to_owned());
                return;
            };
            sum = next;
            seen += chunk.len();
            let partial = PartialResult::new(seen as f64 / total as f64, sum);
            yield serde_json::to_value(partial).map_err(|e| e.to_string());
        }
    })
}
