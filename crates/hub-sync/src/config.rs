//! Runtime configuration for the sync engine and the outer scheduler.
//!
//! A timeout/concurrency/heartbeat knob set for the engine itself, plus a
//! separate retry/backoff config that the engine never consults: there is
//! no retry loop inside the engine itself, the outer scheduler triggers
//! rounds periodically and retries failed ones on its own cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine-facing knobs: how long a round may run, how many may run at once,
/// and whether a heartbeat keeps an idle connection to a peer alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub timeout: Duration,
    pub max_concurrent_syncs: usize,
    pub enable_heartbeat: bool,
    pub heartbeat_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_concurrent_syncs: 10,
            enable_heartbeat: true,
            heartbeat_interval: Duration::from_secs(15),
        }
    }
}

impl SyncConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_syncs(mut self, max: usize) -> Self {
        self.max_concurrent_syncs = max;
        self
    }

    pub fn without_heartbeat(mut self) -> Self {
        self.enable_heartbeat = false;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// Retry/backoff shape for the *outer* scheduler. The engine itself never
/// reads this — it is carried here so a caller has a concrete, ambient
/// config to apply when it decides to retry a failed round: `unavailable`
/// errors are transient, so during sync the round is abandoned and left
/// for the outer scheduler to retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff duration before the given retry attempt (0-indexed), capped at `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }
}
