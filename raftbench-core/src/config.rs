//! Polling and retry configuration.
//!
//! Every bounded polling loop in the bootstrap (address resolution, leader
//! discovery) takes an explicit [`RetryPolicy`] instead of reaching for
//! ambient constants, so tests can run the loops under simulated time.

use std::time::Duration;

/// Bounded polling policy: how many times to ask, how long to wait between
/// asks, and how long a single ask may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub timeout_per_attempt: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration, timeout_per_attempt: Duration) -> Self {
        Self { max_attempts, interval, timeout_per_attempt }
    }

    /// Address resolution: poll a freshly spawned node for up to ~5 seconds.
    pub fn address_resolution() -> Self {
        Self::new(10, Duration::from_millis(500), Duration::from_secs(1))
    }

    /// Leader discovery: one cluster scan every 500ms for up to ~15 seconds.
    pub fn leader_discovery() -> Self {
        Self::new(30, Duration::from_millis(500), Duration::from_secs(1))
    }
}
