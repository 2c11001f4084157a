// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration and the compile-then-create-or-reattach startup
//! sequence (§4.8 "Reattach / recovery", §6 "Job-manager configuration
//! file"), grounded on the teacher's own `lifecycle.rs` but scoped to the
//! single pipestance one `mrp` process drives, rather than a multi-pipeline
//! daemon with its own socket and WAL.

use std::path::PathBuf;
use std::sync::Arc;

use mro_core::{CompiledAst, IdGen, SystemClock, UuidIdGen};
use mro_jobmanager::{ClusterConfig, ClusterJobManager, JobManager, JobManagerError, JobMode, LocalJobManager, Traced};
use mro_runtime::{Pipestance, RuntimeError};
use thiserror::Error;

/// Everything `mrp` needs to compile a source file and create-or-reattach
/// the pipestance it names.
#[derive(Debug, Clone)]
pub struct Config {
    pub src: PathBuf,
    pub root_dir: PathBuf,
    pub job_mode: JobMode,
    pub psid: Option<String>,
    pub cluster_config: Option<PathBuf>,
    pub onfinish: Option<String>,
    pub threads: u32,
    pub mem_gb: u32,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("compiling {0}")]
    Compile(String),
    #[error(transparent)]
    JobManager(#[from] JobManagerError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Compile the root source file, with its own directory as the sole
/// include search path.
pub fn compile(src: &std::path::Path) -> Result<CompiledAst, LifecycleError> {
    let search_paths = src.parent().map(|p| vec![p.to_path_buf()]).unwrap_or_default();
    match mro_compiler::compile_file(src, &search_paths) {
        mro_compiler::CompileResult::Ok(compiled) => Ok(compiled),
        mro_compiler::CompileResult::ParseError(e) => Err(LifecycleError::Compile(e.to_string())),
        mro_compiler::CompileResult::IncludeError(e) => Err(LifecycleError::Compile(e.to_string())),
        mro_compiler::CompileResult::CompileErrors(errors) => Err(LifecycleError::Compile(errors.to_string())),
    }
}

/// A fixed-value `IdGen`, used when `--psid` overrides the generated
/// pipestance id.
#[derive(Clone)]
struct FixedIdGen(String);

impl IdGen for FixedIdGen {
    fn next(&self) -> String {
        self.0.clone()
    }
}

/// Build the job manager named by `config.job_mode`, wrapped in `Traced` the
/// way every job manager is in this stack.
pub fn build_job_manager(config: &Config) -> Result<Arc<dyn JobManager>, LifecycleError> {
    match config.job_mode {
        JobMode::Local => Ok(Arc::new(Traced::new(LocalJobManager::new(config.threads, config.mem_gb)))),
        JobMode::Sge | JobMode::Lsf | JobMode::Slurm => {
            let path = config.cluster_config.as_ref().ok_or_else(|| {
                LifecycleError::JobManager(JobManagerError::BadTemplate(
                    "cluster job modes require --cluster-config".to_string(),
                ))
            })?;
            let raw = std::fs::read_to_string(path).map_err(|source| LifecycleError::Io { path: path.clone(), source })?;
            let cluster_config = ClusterConfig::from_toml(&raw)?;
            Ok(Arc::new(Traced::new(ClusterJobManager::new(cluster_config))))
        }
    }
}

/// Create a fresh pipestance under `config.root_dir`, or reattach to one
/// already started there (recognized by the presence of `_uuid`).
pub fn startup(config: &Config, compiled: &CompiledAst) -> Result<Pipestance, LifecycleError> {
    let uuid_marker = config.root_dir.join("_uuid");
    if uuid_marker.exists() {
        return Ok(Pipestance::reattach(compiled, config.root_dir.clone(), config.job_mode)?);
    }

    std::fs::create_dir_all(&config.root_dir).map_err(|source| LifecycleError::Io {
        path: config.root_dir.clone(),
        source,
    })?;
    let clock = SystemClock;
    match &config.psid {
        Some(psid) => {
            let id_gen = FixedIdGen(psid.clone());
            Ok(Pipestance::create(compiled, config.root_dir.clone(), config.job_mode, &id_gen, &clock)?)
        }
        None => {
            let id_gen = UuidIdGen;
            Ok(Pipestance::create(compiled, config.root_dir.clone(), config.job_mode, &id_gen, &clock)?)
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
