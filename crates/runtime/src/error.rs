// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown callee {0:?} at the top-level call")]
    UnknownTopCallee(String),
    #[error("unresolved call reference {0:?} in binding for {1:?}")]
    UnresolvedCallReference(String, String),
    #[error("duplicate instance id {0:?} in pipeline {1:?}")]
    DuplicateInstanceId(String, String),
    #[error("source declares no top-level call")]
    NoTopCall,
    #[error("sweep bindings on call {0:?} disagree on length ({1} vs {2})")]
    SweepLengthMismatch(String, usize, usize),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pipestance metadata error: {0}")]
    Metadata(#[from] mro_storage::MetadataError),
    #[error("pipestance lock error: {0}")]
    Lock(#[from] mro_storage::LockError),
    #[error("job manager error: {0}")]
    JobManager(#[from] mro_jobmanager::JobManagerError),
    #[error("free disk space on {path} dropped to {bytes} bytes, below the {threshold} byte threshold")]
    DiskFull { path: String, bytes: u64, threshold: u64 },
    #[error("pipestance directory is locked by another controller")]
    AlreadyLocked,
    #[error("job mode on reattach ({found}) does not match the configured job mode ({expected})")]
    JobModeMismatch { expected: String, found: String },
}
