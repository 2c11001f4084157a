// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Job submission and liveness tracking for local subprocesses and cluster
//! schedulers (SGE/LSF/Slurm-style template submission).

mod cluster;
mod error;
mod heartbeat;
mod job;
mod local;
mod traced;

#[cfg(feature = "test-support")]
mod fake;

pub use cluster::{ClusterConfig, ClusterJobManager};
pub use error::JobManagerError;
pub use heartbeat::HeartbeatGate;
pub use job::{JobHandle, JobMode, JobSpec, QueueState, ResourceSnapshot};
pub use local::LocalJobManager;
pub use traced::Traced;

#[cfg(feature = "test-support")]
pub use fake::FakeJobManager;

use async_trait::async_trait;
use std::collections::HashMap;

/// Abstraction over how a job's command line becomes a running process,
/// shared by the local subprocess path and every cluster scheduler.
///
/// Implementations never block the scheduler loop: `submit` returns as soon
/// as the process or cluster job is launched, and completion is observed
/// later through the node's metadata directory, not through this trait.
#[async_trait]
pub trait JobManager: Send + Sync {
    fn job_mode(&self) -> JobMode;

    /// Re-read locally available compute (or, for cluster modes, the
    /// configured ceiling) before the scheduler decides what else it can
    /// start this tick.
    async fn refresh_resources(&self) -> Result<ResourceSnapshot, JobManagerError>;

    /// Whether this job manager supports a bulk queue-status query.
    /// Local mode has no queue; cluster modes do.
    fn has_queue_check(&self) -> bool;

    /// Query the scheduler for the state of a batch of previously submitted
    /// jobs. Callers are expected to rate-limit this themselves (see
    /// `HeartbeatGate`) since cluster queue commands are expensive.
    async fn check_queue(&self, job_ids: &[String]) -> Result<HashMap<String, QueueState>, JobManagerError>;

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobManagerError>;
}
