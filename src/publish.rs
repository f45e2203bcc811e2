//! Published snapshot cell
//!
//! A refresh produces an immutable snapshot; the cell swaps it in atomically
//! and readers always observe a complete snapshot. A late refresh simply
//! overwrites the previous result.

use std::sync::Arc;

use parking_lot::RwLock;

/// A published value together with its publish sequence number
#[derive(Debug)]
pub struct Published<T> {
    /// Monotonic sequence, starting at 1 for the first publish
    pub sequence: u64,
    pub value: T,
}

/// Single-writer, many-reader cell holding the latest snapshot
#[derive(Debug)]
pub struct SnapshotCell<T> {
    inner: RwLock<Option<Arc<Published<T>>>>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }
}

impl<T> SnapshotCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot, returning its sequence number
    pub fn publish(&self, value: T) -> u64 {
        let mut slot = self.inner.write();
        let sequence = slot.as_ref().map_or(1, |p| p.sequence + 1);
        *slot = Some(Arc::new(Published { sequence, value }));
        sequence
    }

    /// Latest published snapshot, if any
    pub fn latest(&self) -> Option<Arc<Published<T>>> {
        self.inner.read().clone()
    }

    /// Sequence number of the latest snapshot (0 before the first publish)
    pub fn sequence(&self) -> u64 {
        self.inner.read().as_ref().map_or(0, |p| p.sequence)
    }
}
