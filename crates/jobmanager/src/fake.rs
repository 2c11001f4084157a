// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job manager for deterministic runtime/daemon tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::JobManagerError;
use crate::job::{JobHandle, JobMode, JobSpec, QueueState, ResourceSnapshot};
use crate::JobManager;

/// A job manager whose submissions complete (or fail) exactly as the test
/// scripts them, with no real process or scheduler involved.
pub struct FakeJobManager {
    resources: ResourceSnapshot,
    next_id: Mutex<u64>,
    /// Jobs queued here resolve to `QueueState::Done` once a test calls
    /// `complete`; everything else defaults to `Running`.
    completed: Mutex<std::collections::HashSet<String>>,
    submitted: Mutex<Vec<JobSpec>>,
}

impl FakeJobManager {
    pub fn new(resources: ResourceSnapshot) -> Self {
        Self {
            resources,
            next_id: Mutex::new(1),
            completed: Mutex::new(std::collections::HashSet::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn complete(&self, job_id: &str) {
        self.completed.lock().insert(job_id.to_string());
    }

    pub fn submitted_specs(&self) -> Vec<JobSpec> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl JobManager for FakeJobManager {
    fn job_mode(&self) -> JobMode {
        JobMode::Local
    }

    async fn refresh_resources(&self) -> Result<ResourceSnapshot, JobManagerError> {
        Ok(self.resources)
    }

    fn has_queue_check(&self) -> bool {
        true
    }

    async fn check_queue(&self, job_ids: &[String]) -> Result<HashMap<String, QueueState>, JobManagerError> {
        let completed = self.completed.lock();
        Ok(job_ids
            .iter()
            .map(|id| {
                let state = if completed.contains(id) {
                    QueueState::Done
                } else {
                    QueueState::Running
                };
                (id.clone(), state)
            })
            .collect())
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobManagerError> {
        let mut next_id = self.next_id.lock();
        let id = *next_id;
        *next_id += 1;
        self.submitted.lock().push(spec.clone());
        Ok(JobHandle(id.to_string()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
