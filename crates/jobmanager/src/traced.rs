// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing-instrumented wrapper shared by every `JobManager` implementation,
//! following the same `Traced<T>` adapter shape used elsewhere for agent
//! and session adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::instrument;

use crate::error::JobManagerError;
use crate::job::{JobHandle, JobMode, JobSpec, QueueState, ResourceSnapshot};
use crate::JobManager;

pub struct Traced<J> {
    inner: J,
}

impl<J> Traced<J> {
    pub fn new(inner: J) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> J {
        self.inner
    }
}

#[async_trait]
impl<J: JobManager> JobManager for Traced<J> {
    fn job_mode(&self) -> JobMode {
        self.inner.job_mode()
    }

    #[instrument(skip(self), fields(job_mode = %self.inner.job_mode()))]
    async fn refresh_resources(&self) -> Result<ResourceSnapshot, JobManagerError> {
        let result = self.inner.refresh_resources().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "refresh_resources failed");
        }
        result
    }

    fn has_queue_check(&self) -> bool {
        self.inner.has_queue_check()
    }

    #[instrument(skip(self, job_ids), fields(job_mode = %self.inner.job_mode(), count = job_ids.len()))]
    async fn check_queue(&self, job_ids: &[String]) -> Result<HashMap<String, QueueState>, JobManagerError> {
        let result = self.inner.check_queue(job_ids).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "check_queue failed");
        }
        result
    }

    #[instrument(skip(self, spec), fields(job_mode = %self.inner.job_mode(), job_name = %spec.job_name))]
    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobManagerError> {
        let result = self.inner.submit(spec).await;
        match &result {
            Ok(handle) => tracing::info!(job_id = %handle, "submitted"),
            Err(e) => tracing::warn!(error = %e, "submit failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
