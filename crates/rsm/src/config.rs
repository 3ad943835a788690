//! Driver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long one apply iteration waits for the next slot to be decided
/// before switching to catch-up.
pub const DEFAULT_INSTANCE_WAIT_MS: u64 = 100;

/// Applied-instance count after which the coordinator is asked to forget
/// old slots. The trim fires on the apply that pushes the counter past
/// this value, i.e. on the 101st apply with the default.
pub const DEFAULT_FORGET_THRESHOLD: u32 = 100;

/// Driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Bound on the wait for a decided slot, in milliseconds
    pub instance_wait_ms: u64,
    /// Applied-instance count between periodic forget hints
    pub forget_threshold: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            instance_wait_ms: DEFAULT_INSTANCE_WAIT_MS,
            forget_threshold: DEFAULT_FORGET_THRESHOLD,
        }
    }
}

impl DriverConfig {
    /// The decided-slot wait as a [`Duration`].
    pub fn instance_wait(&self) -> Duration {
        Duration::from_millis(self.instance_wait_ms)
    }
}
