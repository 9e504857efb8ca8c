//! Presence timing configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Timing knobs for presence tracking and eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    /// Maximum gap between now and a participant's last heartbeat before
    /// it becomes eligible for eviction.
    pub stale_after: Duration,
    /// Delay between two sweeps.
    pub sweep_interval: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(15),
        }
    }
}

impl ChatConfig {
    /// Epoch millis below which a `last_seen` value counts as stale at `now`.
    #[must_use]
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> i64 {
        let window = i64::try_from(self.stale_after.as_millis()).unwrap_or(i64::MAX);
        now.timestamp_millis().saturating_sub(window)
    }
}
