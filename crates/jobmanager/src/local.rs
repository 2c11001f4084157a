// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local subprocess job manager: stages run as direct child processes of
//! the daemon.

use std::collections::HashMap;
use std::fs::File;
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::{Child, Command};

use crate::error::JobManagerError;
use crate::job::{JobHandle, JobMode, JobSpec, QueueState, ResourceSnapshot};
use crate::JobManager;

/// Spawns stage commands as direct child processes and tracks them by pid
/// for the lifetime of this process. A daemon restart loses the in-memory
/// `children` map; liveness after a restart falls back to `/proc/<pid>`
/// on Linux, which is why `RestartLocalJobs` recovery treats local jobs
/// more conservatively than cluster jobs.
pub struct LocalJobManager {
    total_threads: u32,
    total_mem_gb: u32,
    children: Mutex<HashMap<u32, Child>>,
}

impl LocalJobManager {
    pub fn new(total_threads: u32, total_mem_gb: u32) -> Self {
        Self {
            total_threads,
            total_mem_gb,
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a previously submitted job's process is still alive. Checks
    /// the in-memory handle first (cheap, reaps zombies via `try_wait`),
    /// then falls back to `/proc` for jobs submitted by a prior daemon
    /// instance.
    pub fn is_alive(&self, handle: &JobHandle) -> bool {
        let pid: u32 = match handle.0.parse() {
            Ok(pid) => pid,
            Err(_) => return false,
        };
        {
            let mut children = self.children.lock();
            if let Some(child) = children.get_mut(&pid) {
                match child.try_wait() {
                    Ok(Some(_status)) => {
                        children.remove(&pid);
                        return false;
                    }
                    Ok(None) => return true,
                    Err(_) => return false,
                }
            }
        }
        proc_alive(pid)
    }
}

#[cfg(target_os = "linux")]
fn proc_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn proc_alive(_pid: u32) -> bool {
    false
}

#[async_trait]
impl JobManager for LocalJobManager {
    fn job_mode(&self) -> JobMode {
        JobMode::Local
    }

    async fn refresh_resources(&self) -> Result<ResourceSnapshot, JobManagerError> {
        Ok(ResourceSnapshot {
            available_threads: self.total_threads,
            available_mem_gb: self.total_mem_gb,
        })
    }

    fn has_queue_check(&self) -> bool {
        false
    }

    async fn check_queue(&self, _job_ids: &[String]) -> Result<HashMap<String, QueueState>, JobManagerError> {
        Ok(HashMap::new())
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobManagerError> {
        let stdout = File::create(&spec.stdout_path)?;
        let stderr = File::create(&spec.stderr_path)?;

        let (program, args) = spec
            .cmd
            .split_first()
            .ok_or_else(|| JobManagerError::BadTemplate("empty command".to_string()))?;

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(false)
            .spawn()?;

        let pid = child.id().ok_or_else(|| JobManagerError::Io(std::io::Error::other("child exited before pid was observable")))?;
        self.children.lock().insert(pid, child);
        Ok(JobHandle(pid.to_string()))
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
