//! Error types for the RSM driver.

use thiserror::Error;

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Driver error types.
///
/// `Precondition` and `Codec` surface synchronously to callers; transient
/// conditions inside the apply loop are logged and retried rather than
/// surfaced.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller misuse, e.g. submitting an id beyond the allocator or
    /// forgetting above the applied pointer
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Input framing could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(#[from] rsm_storage::Error),

    /// A durable progress record exists but cannot be decoded
    #[error("Corrupt progress record: {0}")]
    Corrupt(String),

    /// Consensus layer failure
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// State transformer failure
    #[error("Transform error: {0}")]
    Transform(String),

    /// `start` called on a driver that is already running
    #[error("Driver already running")]
    AlreadyRunning,

    /// Operation requires a running driver
    #[error("Driver not running")]
    NotRunning,
}
