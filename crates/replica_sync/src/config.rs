//! Configuration for the sync engine.

use std::time::Duration;

/// Tunable parameters for sync passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Minimum interval between two non-forced full downloads.
    ///
    /// A `download(force=false)` inside this window succeeds without
    /// touching the network.
    pub throttle_interval: Duration,
}

impl SyncConfig {
    /// Creates the default configuration (one-hour throttle).
    #[must_use]
    pub fn new() -> Self {
        Self {
            throttle_interval: Duration::from_millis(3_600_000),
        }
    }

    /// Sets the download throttle interval.
    #[must_use]
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
