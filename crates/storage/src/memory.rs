//! In-memory store implementation.

use crate::{Result, Store};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory [`Store`] backed by a `BTreeMap`.
///
/// Not durable: contents are lost when the value is dropped. Intended for
/// tests and for embedders that accept losing progress on restart. Cloning
/// is cheap and clones share the same underlying map, which is what the
/// crash-recovery tests rely on to survive a simulated restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: std::sync::Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all data.
    pub fn reset(&self) {
        self.inner.write().clear();
    }

    /// Returns the number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.inner.write().insert(key.to_vec(), value);
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().get(key).cloned())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.inner.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove() {
        let store = MemoryStore::new();

        store.put(b"k", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(vec![1, 2, 3]));
        assert!(store.contains(b"k").await.unwrap());

        store.remove(b"k").await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), None);

        // Idempotent remove
        store.remove(b"k").await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_data() {
        let store = MemoryStore::new();
        let view = store.clone();

        store.put(b"k", vec![9]).await.unwrap();
        assert_eq!(view.get(b"k").await.unwrap(), Some(vec![9]));

        view.reset();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = MemoryStore::new();

        store.put(b"k", vec![1]).await.unwrap();
        store.put(b"k", vec![2]).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(vec![2]));
        assert_eq!(store.len(), 1);
    }
}
