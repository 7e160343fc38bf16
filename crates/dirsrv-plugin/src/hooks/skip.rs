//! Per-operation record of post-operation hooks to bypass.
//!
//! When a pre-operation hook halts, the hooks at and after it never ran
//! their pre-operation half, so their post-operation half must not run
//! either. The tracker remembers them per operation until post-operation
//! dispatch takes the record.

use dashmap::DashMap;
use tracing::debug;

use dirsrv_core::types::OperationKey;

use super::registry::HookId;

/// Hooks to bypass during one post-operation dispatch.
pub type SkipSet = Vec<HookId>;

/// Tracks skip records for in-flight operations.
#[derive(Debug, Default)]
pub struct SkipTracker {
    entries: DashMap<OperationKey, SkipSet>,
}

impl SkipTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records hooks to skip for an operation, after any already recorded.
    pub fn record_skip<I>(&self, key: OperationKey, ids: I)
    where
        I: IntoIterator<Item = HookId>,
    {
        let mut entry = self.entries.entry(key).or_default();
        for id in ids {
            if !entry.contains(&id) {
                entry.push(id);
            }
        }
        debug!(operation_key = %key, skipped = entry.len(), "Recorded post-operation skips");
    }

    /// Records a single hook to skip for an operation.
    pub fn record_single(&self, key: OperationKey, id: HookId) {
        self.record_skip(key, std::iter::once(id));
    }

    /// Removes and returns the skip record of an operation. Empty when the
    /// operation has none.
    pub fn take_skip(&self, key: OperationKey) -> SkipSet {
        self.entries
            .remove(&key)
            .map(|(_, ids)| ids)
            .unwrap_or_default()
    }

    /// Drops the record of an operation that ends without reaching
    /// post-operation. Returns whether a record existed.
    pub fn abandon(&self, key: OperationKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Whether an operation has a pending record.
    pub fn contains(&self, key: OperationKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of operations with a pending record.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
