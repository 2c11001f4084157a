// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-backed state machine shared by a plain stage fork, a chunk, and
//! a fork's synthetic split/join jobs (§4.3): all of them advance through
//! the same Waiting → Ready → Queued → Running → Complete/Failed sequence,
//! parameterized only by how their `JobSpec` is built.

use mro_jobmanager::{JobHandle, JobManager, JobSpec, QueueState, ResourceSnapshot};
use mro_storage::{MetadataFile, MetadataStore};

use crate::error::RuntimeError;
use crate::node::ResourceRequest;
use crate::NodeState;

#[derive(Debug)]
pub struct Slot {
    pub state: NodeState,
    pub job_handle: Option<JobHandle>,
    pub resources: ResourceRequest,
}

impl Slot {
    pub fn new(resources: ResourceRequest) -> Self {
        Self {
            state: NodeState::Waiting,
            job_handle: None,
            resources,
        }
    }

    pub fn mark_ready(&mut self) {
        if self.state == NodeState::Waiting {
            self.state = NodeState::Ready;
        }
    }

    pub fn mark_disabled(&mut self) {
        self.state = NodeState::DisabledState;
    }

    /// Advance by one tick. Returns whether the slot's state changed.
    /// `available` is decremented when a job is admitted so a scheduler
    /// can share one resource budget across many slots within a step.
    pub async fn step(
        &mut self,
        metadata: &MetadataStore,
        job_manager: &dyn JobManager,
        available: &mut ResourceSnapshot,
        build_spec: impl FnOnce() -> JobSpec,
    ) -> Result<bool, RuntimeError> {
        match self.state {
            NodeState::Ready => self.try_admit(metadata, job_manager, available, build_spec).await,
            NodeState::Queued => self.poll_queued(metadata, job_manager).await,
            NodeState::Running => self.poll_running(metadata, job_manager).await,
            _ => Ok(false),
        }
    }

    async fn try_admit(
        &mut self,
        metadata: &MetadataStore,
        job_manager: &dyn JobManager,
        available: &mut ResourceSnapshot,
        build_spec: impl FnOnce() -> JobSpec,
    ) -> Result<bool, RuntimeError> {
        if self.resources.threads > available.available_threads || self.resources.mem_gb > available.available_mem_gb {
            // Stays Ready; does not regress to Waiting (§4.3 edge case).
            return Ok(false);
        }
        let spec = build_spec();
        let handle = job_manager.submit(&spec).await?;
        metadata.write_string(MetadataFile::JobId, &handle.0)?;
        available.available_threads -= self.resources.threads;
        available.available_mem_gb -= self.resources.mem_gb;
        self.job_handle = Some(handle);
        self.state = NodeState::Queued;
        Ok(true)
    }

    async fn poll_queued(&mut self, metadata: &MetadataStore, job_manager: &dyn JobManager) -> Result<bool, RuntimeError> {
        if self.observe_terminal_files(metadata) {
            return Ok(true);
        }
        if metadata.exists(MetadataFile::Heartbeat) {
            self.state = NodeState::Running;
            return Ok(true);
        }
        if job_manager.has_queue_check() {
            if let Some(handle) = &self.job_handle {
                let states = job_manager.check_queue(std::slice::from_ref(&handle.0)).await?;
                if let Some(QueueState::Running) = states.get(&handle.0) {
                    self.state = NodeState::Running;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn poll_running(&mut self, metadata: &MetadataStore, job_manager: &dyn JobManager) -> Result<bool, RuntimeError> {
        if self.observe_terminal_files(metadata) {
            return Ok(true);
        }
        if job_manager.has_queue_check() {
            if let Some(handle) = &self.job_handle {
                let states = job_manager.check_queue(std::slice::from_ref(&handle.0)).await?;
                match states.get(&handle.0) {
                    Some(QueueState::Done) => {
                        self.state = NodeState::Complete;
                        return Ok(true);
                    }
                    Some(QueueState::Unknown) => {
                        // Liveness probe found the job in neither the queue nor
                        // the local process table (§4.3 "Running → Failed").
                        self.state = NodeState::Failed;
                        return Ok(true);
                    }
                    _ => {}
                }
            }
        }
        Ok(false)
    }

    fn observe_terminal_files(&mut self, metadata: &MetadataStore) -> bool {
        if metadata.exists(MetadataFile::Complete) {
            self.state = NodeState::Complete;
            true
        } else if metadata.exists(MetadataFile::Errors) {
            self.state = NodeState::Failed;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
