//! Collaborator traits for the consensus layer and the application.

use crate::input::{Input, Output};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// The consensus layer as seen by the driver.
///
/// The driver never inspects how agreement is reached; it only needs to
/// submit a value for a slot, retrieve decided slots, ask peers for slots
/// it is missing, and learn how far the cluster has progressed.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Submits `value` for slot `id`. Idempotent for the same `(id, value)`.
    async fn coordinate(&self, id: i32, value: Bytes) -> Result<()>;

    /// Resolves with the decided value for slot `id`. Completes only once
    /// the slot is decided; callers bound the wait.
    async fn instance(&self, id: i32) -> Result<Bytes>;

    /// Hints that slot `id` should be pulled from peers.
    async fn learn(&self, id: i32) -> Result<()>;

    /// Highest slot the cluster is known to have reached.
    async fn max(&self) -> Result<i32>;

    /// Allows slots strictly below `before` to be dropped.
    async fn forget(&self, before: i32) -> Result<()>;
}

/// The application state transformer.
///
/// `transform` must be deterministic per `(id, content)` and idempotent
/// under re-invocation with identical input: after a crash the driver
/// re-drives the instance that was in flight, so an instance may be
/// transformed more than once across runs. Durable side effects must be
/// keyed by the instance id.
#[async_trait]
pub trait StateTransfer: Send + Sync {
    /// Folds one decided input into application state.
    async fn transform(&self, input: Input) -> Result<Output>;
}
