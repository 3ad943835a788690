//! Pending submissions and their completion handles.
//!
//! The map holds only weak references: once the last submitter drops its
//! [`SubmitHandle`], the entry can be collected before or after the apply
//! loop reaches it, and completion of a collected entry is a no-op.

use crate::input::Output;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Cell {
    slot: Mutex<Option<Output>>,
    notify: Notify,
}

impl Cell {
    fn complete(&self, output: Output) {
        *self.slot.lock() = Some(output);
        self.notify.notify_waiters();
    }
}

/// Completion handle returned to a submitter.
///
/// Resolves when the submitted input has been applied. Cloning yields
/// another handle to the same completion; a completed handle keeps its
/// value, so waiting after completion returns immediately.
#[derive(Debug, Clone)]
pub struct SubmitHandle {
    cell: Arc<Cell>,
}

impl SubmitHandle {
    /// Waits for the output produced by applying the submitted input.
    pub async fn wait(&self) -> Output {
        loop {
            let notified = self.cell.notify.notified();
            if let Some(output) = self.cell.slot.lock().clone() {
                return output;
            }
            notified.await;
        }
    }

    /// Returns the output without waiting, if the input has been applied.
    pub fn try_get(&self) -> Option<Output> {
        self.cell.slot.lock().clone()
    }
}

/// Weak-valued map from instance id to completion cell.
#[derive(Debug, Default)]
pub struct PendingMap {
    inner: Mutex<HashMap<i32, Weak<Cell>>>,
}

impl PendingMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle registered under `id`, creating one if the entry
    /// is absent or every previous holder dropped theirs. Idempotent while
    /// at least one handle stays alive.
    pub fn get_or_create(&self, id: i32) -> SubmitHandle {
        let mut map = self.inner.lock();
        if let Some(cell) = map.get(&id).and_then(Weak::upgrade) {
            return SubmitHandle { cell };
        }
        let cell = Arc::new(Cell::default());
        map.insert(id, Arc::downgrade(&cell));
        SubmitHandle { cell }
    }

    /// Delivers `output` to any surviving handle under `id` and removes the
    /// entry. A no-op when no submitter is listening.
    pub fn complete(&self, id: i32, output: Output) {
        let cell = self.inner.lock().remove(&id).and_then(|weak| weak.upgrade());
        if let Some(cell) = cell {
            cell.complete(output);
        }
    }

    /// Number of map entries, live or collected.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let map = PendingMap::new();
        let a = map.get_or_create(3);
        let b = map.get_or_create(3);
        assert_eq!(map.len(), 1);

        map.complete(3, Bytes::from_static(b"out"));
        assert_eq!(a.wait().await, Bytes::from_static(b"out"));
        assert_eq!(b.wait().await, Bytes::from_static(b"out"));
    }

    #[tokio::test]
    async fn wait_after_completion_resolves_immediately() {
        let map = PendingMap::new();
        let handle = map.get_or_create(0);
        map.complete(0, Bytes::from_static(b"v"));
        assert_eq!(handle.try_get(), Some(Bytes::from_static(b"v")));
        assert_eq!(handle.wait().await, Bytes::from_static(b"v"));
        // Entry is consumed by completion.
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn wait_blocks_until_completed() {
        let map = Arc::new(PendingMap::new());
        let handle = map.get_or_create(1);
        assert_eq!(handle.try_get(), None);

        let waiter = tokio::spawn(async move { handle.wait().await });
        tokio::task::yield_now().await;
        map.complete(1, Bytes::from_static(b"done"));
        assert_eq!(waiter.await.unwrap(), Bytes::from_static(b"done"));
    }

    #[test]
    fn dropped_handles_are_collected() {
        let map = PendingMap::new();
        let handle = map.get_or_create(5);
        drop(handle);

        // The weak entry is dead; a new request gets a fresh cell.
        let fresh = map.get_or_create(5);
        assert_eq!(fresh.try_get(), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn complete_without_waiter_is_noop() {
        let map = PendingMap::new();
        map.complete(9, Bytes::from_static(b"unheard"));

        let handle = map.get_or_create(7);
        drop(handle);
        map.complete(7, Bytes::from_static(b"unheard"));
        assert!(map.is_empty());
    }
}
