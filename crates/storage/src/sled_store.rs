//! Durable store implementation over the `sled` embedded database.

use crate::{Result, StorageConfig, Store};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// A durable [`Store`] backed by a `sled` database.
///
/// Every write flushes before returning, so the `Store` durability contract
/// holds at the cost of write throughput. The driver writes at most two keys
/// per applied instance, which keeps that cost negligible.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Opens (or creates) a database at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(&path)?;
        debug!(path = %path.as_ref().display(), "opened store");
        Ok(Self { db })
    }

    /// Opens (or creates) a database from a [`StorageConfig`].
    pub fn open_with_config(config: &StorageConfig) -> Result<Self> {
        let mut builder = sled::Config::new().path(&config.path);
        if let Some(capacity) = config.cache_capacity {
            builder = builder.cache_capacity(capacity);
        }
        let db = builder.open()?;
        Ok(Self { db })
    }

    /// Flushes any buffered writes to disk.
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SledStore {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.db.remove(key)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }
}
