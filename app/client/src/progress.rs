//! Registry of outstanding operations, for display and manual cancellation.
//!
//! The tracker holds one entry per registered, unfinished operation. An entry
//! disappears when its bar finishes, so the entry count always equals the
//! number of operations still in flight.

use crate::operation::Cancellable;
use compact_str::CompactString;
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

/// No remaining-time estimate before this much progress time has passed.
const ESTIMATE_AFTER: Duration = Duration::from_secs(2);

struct Entry {
    description: CompactString,
    operation: Option<Arc<dyn Cancellable>>,
    position: f64,
    first_update: Option<(Instant, f64)>,
    remaining: Option<Duration>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

/// A visible progress item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressItem {
    /// Bar id.
    pub id: u64,
    /// Description of the tracked operation.
    pub description: CompactString,
    /// Fraction done, in `[0, 1]`.
    pub position: f64,
    /// Estimated time to completion, once known.
    pub remaining: Option<Duration>,
}

/// Shared registry of progress bars. Clones share the registry.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    registry: Arc<Mutex<Registry>>,
}

impl ProgressTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `operation` under `description`.
    pub fn register<C>(&self, operation: C, description: impl Into<CompactString>) -> ProgressBar
    where
        C: Cancellable + 'static,
    {
        self.insert(Some(Arc::new(operation)), description.into())
    }

    /// Track work that cannot be cancelled.
    pub fn register_detached(&self, description: impl Into<CompactString>) -> ProgressBar {
        self.insert(None, description.into())
    }

    fn insert(
        &self,
        operation: Option<Arc<dyn Cancellable>>,
        description: CompactString,
    ) -> ProgressBar {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        tracing::debug!("progress {id} started: {description}");
        registry.entries.insert(
            id,
            Entry {
                description,
                operation,
                position: 0.0,
                first_update: None,
                remaining: None,
            },
        );
        ProgressBar {
            id,
            tracker: self.clone(),
        }
    }

    /// Remove a bar. Returns `false` if it was already gone.
    pub fn unregister(&self, bar: &ProgressBar) -> bool {
        self.remove(bar.id)
    }

    /// Stop the operation behind bar `id` and remove the bar.
    ///
    /// Returns whether the operation accepted the cancellation.
    pub fn cancel(&self, id: u64) -> bool {
        let operation = match self.registry.lock().entries.get(&id) {
            Some(entry) => entry.operation.clone(),
            None => return false,
        };
        let cancelled = operation.is_some_and(|op| op.cancel());
        self.remove(id);
        cancelled
    }

    /// Number of operations still in flight.
    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Whether no operation is in flight.
    pub fn is_empty(&self) -> bool {
        self.registry.lock().entries.is_empty()
    }

    /// Alias of [`is_empty`](Self::is_empty), in display terms.
    pub fn is_idle(&self) -> bool {
        self.is_empty()
    }

    /// Current state of every visible bar, ordered by registration.
    pub fn snapshot(&self) -> Vec<ProgressItem> {
        self.registry
            .lock()
            .entries
            .iter()
            .map(|(id, entry)| ProgressItem {
                id: *id,
                description: entry.description.clone(),
                position: entry.position,
                remaining: entry.remaining,
            })
            .collect()
    }

    fn remove(&self, id: u64) -> bool {
        let removed = self.registry.lock().entries.remove(&id).is_some();
        if removed {
            tracing::debug!("progress {id} finished");
        }
        removed
    }

    fn update(&self, id: u64, position: f64) {
        let mut registry = self.registry.lock();
        let Some(entry) = registry.entries.get_mut(&id) else {
            // Updates may trail completion.
            return;
        };
        let position = position.clamp(0.0, 1.0);
        if position < entry.position {
            tracing::warn!(
                "progress {id} moves backward: {} to {position}",
                entry.position
            );
        }

        let now = Instant::now();
        match entry.first_update {
            None => entry.first_update = Some((now, position)),
            Some((first, start)) => {
                let elapsed = now.duration_since(first);
                let progress = position - start;
                if progress > 0.0 && elapsed > ESTIMATE_AFTER {
                    let ratio = (1.0 - position) / progress;
                    // Tiny steps give estimates no `Duration` can hold.
                    entry.remaining =
                        Duration::try_from_secs_f64(elapsed.as_secs_f64() * ratio).ok();
                }
            }
        }
        entry.position = position;
    }
}

/// Handle to one registered progress item.
#[derive(Clone)]
pub struct ProgressBar {
    id: u64,
    tracker: ProgressTracker,
}

impl ProgressBar {
    /// Bar id within its tracker.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Move the bar; clamped to `[0, 1]`, ignored once finished.
    pub fn set_position(&self, done: f64) {
        self.tracker.update(self.id, done);
    }

    /// Current position, or `None` once finished.
    pub fn position(&self) -> Option<f64> {
        self.tracker
            .registry
            .lock()
            .entries
            .get(&self.id)
            .map(|entry| entry.position)
    }

    /// Estimated time to completion, once known.
    pub fn remaining(&self) -> Option<Duration> {
        self.tracker
            .registry
            .lock()
            .entries
            .get(&self.id)
            .and_then(|entry| entry.remaining)
    }

    /// Mark the tracked work done. Repeated calls are no-ops.
    pub fn set_finished(&self) {
        self.tracker.update(self.id, 1.0);
        self.tracker.unregister(self);
    }

    /// Whether the bar finished.
    pub fn is_finished(&self) -> bool {
        self.position().is_none()
    }

    /// Cancel the tracked operation and finish the bar.
    pub fn cancel(&self) -> bool {
        self.tracker.cancel(self.id)
    }
}
