// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive pipestance lock file.
//!
//! A running pipestance holds a `try_lock_exclusive` advisory lock on a
//! `_lock` file at the root of its metadata tree for its entire lifetime.
//! A second daemon attempting to drive the same pipestance fails fast
//! instead of racing the first one's writes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("pipestance at {0} is already locked by another process")]
    AlreadyLocked(PathBuf),
    #[error("I/O error acquiring lock at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Holds the open file handle for the duration of the lock; dropping it
/// releases the advisory lock.
pub struct PipestanceLock {
    path: PathBuf,
    file: File,
}

impl PipestanceLock {
    /// Acquire the lock, writing the current process id into the file.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;
        file.try_lock_exclusive()
            .map_err(|_| LockError::AlreadyLocked(path.clone()))?;

        let mut file = file;
        file.set_len(0).map_err(|source| LockError::Io {
            path: path.clone(),
            source,
        })?;
        writeln!(file, "{}", std::process::id()).map_err(|source| LockError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
