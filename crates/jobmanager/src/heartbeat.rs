// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiting for bulk queue-status probes.
//!
//! A cluster's `qstat`/`bjobs`/`squeue` equivalent is expensive enough that
//! polling it every scheduler tick would itself become the bottleneck, so
//! probes are gated to at most once per interval regardless of how often
//! the scheduler loop spins.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Tracks the last time a queue probe was allowed to run.
pub struct HeartbeatGate {
    interval: Duration,
    last_probe: Mutex<Option<Instant>>,
}

impl HeartbeatGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_probe: Mutex::new(None),
        }
    }

    /// Whether a probe is due at `now`. Does not itself record the probe;
    /// call `record_probe` after the caller actually performs one so a
    /// failed attempt doesn't silently reset the window.
    pub fn is_due(&self, now: Instant) -> bool {
        match *self.last_probe.lock() {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    pub fn record_probe(&self, now: Instant) {
        *self.last_probe.lock() = Some(now);
    }
}

impl Default for HeartbeatGate {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
