//! Durable key/value persistence for the RSM driver.
//!
//! This crate provides the storage abstraction the driver records its
//! progress pointers in: an object-safe [`Store`] trait with atomic,
//! durable writes, plus two implementations — [`MemoryStore`] for tests
//! and embedders that do not need durability, and [`SledStore`] over the
//! `sled` embedded database for deployments that do.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Storage-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Backend reported a failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Storage configuration for durable stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Filesystem path of the database directory
    pub path: PathBuf,
    /// Page cache capacity in bytes
    pub cache_capacity: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            cache_capacity: Some(64 * 1024 * 1024),
        }
    }
}

/// Durable key→bytes store.
///
/// Writes are atomic per key and durable before the call returns; `remove`
/// is idempotent. The driver keeps only two keys here, but the contract is
/// general.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically stores `value` under `key`, durable before returning.
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &[u8]) -> Result<()>;

    /// Returns whether `key` is present.
    async fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
