// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster job manager: submits jobs through a user-supplied template and
//! queue-status/submit commands, the same SGE/LSF/Slurm-style integration
//! point most pipeline runtimes expose.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::JobManagerError;
use crate::job::{JobHandle, JobMode, JobSpec, QueueState, ResourceSnapshot};
use crate::JobManager;

/// Loaded from a TOML file alongside the cluster template; `submit_cmd` is
/// invoked with the rendered template piped to its stdin and is expected to
/// print the scheduler's job id on stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub job_mode: String,
    pub submit_cmd: String,
    pub queue_cmd: String,
    pub template: String,
    #[serde(default = "default_threads")]
    pub total_threads: u32,
    #[serde(default = "default_mem_gb")]
    pub total_mem_gb: u32,
}

fn default_threads() -> u32 {
    64
}

fn default_mem_gb() -> u32 {
    256
}

impl ClusterConfig {
    pub fn from_toml(raw: &str) -> Result<Self, JobManagerError> {
        toml::from_str(raw).map_err(|e| JobManagerError::BadTemplate(e.to_string()))
    }

    fn mode(&self) -> JobMode {
        match self.job_mode.as_str() {
            "lsf" => JobMode::Lsf,
            "slurm" => JobMode::Slurm,
            _ => JobMode::Sge,
        }
    }
}

/// Replace the fixed set of `__MRO_*__`/`__RESOURCES__` placeholders a
/// cluster template is allowed to reference.
pub fn render_template(template: &str, spec: &JobSpec) -> String {
    template
        .replace("__MRO_JOB_NAME__", &spec.job_name)
        .replace("__MRO_THREADS__", &spec.threads.to_string())
        .replace("__MRO_STDOUT__", &spec.stdout_path.to_string_lossy())
        .replace("__MRO_STDERR__", &spec.stderr_path.to_string_lossy())
        .replace("__MRO_CMD__", &spec.cmd.join(" "))
        .replace(
            "__RESOURCES__",
            &format!("threads={},mem_gb={}", spec.threads, spec.mem_gb),
        )
}

pub struct ClusterJobManager {
    config: ClusterConfig,
}

impl ClusterJobManager {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl JobManager for ClusterJobManager {
    fn job_mode(&self) -> JobMode {
        self.config.mode()
    }

    async fn refresh_resources(&self) -> Result<ResourceSnapshot, JobManagerError> {
        Ok(ResourceSnapshot {
            available_threads: self.config.total_threads,
            available_mem_gb: self.config.total_mem_gb,
        })
    }

    fn has_queue_check(&self) -> bool {
        true
    }

    async fn check_queue(&self, job_ids: &[String]) -> Result<HashMap<String, QueueState>, JobManagerError> {
        if job_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let output = Command::new(&self.config.queue_cmd)
            .args(job_ids)
            .output()
            .await?;
        if !output.status.success() {
            return Err(JobManagerError::QueueUnavailable(format!(
                "{} exited with {}",
                self.config.queue_cmd, output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut states = HashMap::new();
        for id in job_ids {
            let state = if stdout.contains(&format!("{id} r")) || stdout.contains(&format!("{id} R")) {
                QueueState::Running
            } else if stdout.contains(&format!("{id} qw")) || stdout.contains(&format!("{id} PD")) {
                QueueState::Queued
            } else if stdout.contains(id.as_str()) {
                QueueState::Done
            } else {
                QueueState::Unknown
            };
            states.insert(id.clone(), state);
        }
        Ok(states)
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobManagerError> {
        let rendered = render_template(&self.config.template, spec);
        let mut child = Command::new(&self.config.submit_cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        {
            let stdin = child.stdin.as_mut().ok_or_else(|| {
                JobManagerError::Io(std::io::Error::other("submit command closed stdin"))
            })?;
            stdin.write_all(rendered.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(JobManagerError::SubmitFailed(output.status.code().unwrap_or(-1)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let job_id = stdout
            .split_whitespace()
            .find(|tok| tok.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| JobManagerError::BadSubmitOutput(stdout.trim().to_string()))?;
        Ok(JobHandle(job_id.to_string()))
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
