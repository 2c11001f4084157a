// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Everything a scheduling tick needs that isn't owned by the graph itself,
//! confined to one explicit object rather than scattered through
//! process-wide globals (§9 design note).

use std::sync::Arc;
use std::time::Duration;

use mro_jobmanager::{HeartbeatGate, JobManager};

/// Shared, cloneable configuration and collaborators for one running
/// pipestance. Every component that needs the job manager or the
/// queue-probe rate limiter takes a `&RuntimeContext` rather than reaching
/// for ambient state.
pub struct RuntimeContext {
    pub job_manager: Arc<dyn JobManager>,
    pub heartbeat_gate: HeartbeatGate,
    /// Minimum free space, in bytes, the pipestance root must retain before
    /// the scheduler refuses to admit new jobs (§4.7 "disk-space check").
    pub disk_space_threshold_bytes: u64,
}

impl RuntimeContext {
    pub fn new(job_manager: Arc<dyn JobManager>) -> Self {
        Self {
            job_manager,
            heartbeat_gate: HeartbeatGate::default(),
            disk_space_threshold_bytes: 1024 * 1024 * 1024,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_gate = HeartbeatGate::new(interval);
        self
    }

    pub fn with_disk_space_threshold_bytes(mut self, bytes: u64) -> Self {
        self.disk_space_threshold_bytes = bytes;
        self
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
