// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed access to a node's metadata directory.
//!
//! A node directory holds a fixed set of files, each with a single
//! well-known name. Presence of the file is itself meaningful for some of
//! the vocabulary (`_complete`, `_errors`) so `exists` is a first-class
//! query rather than a side effect of `read`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// The fixed vocabulary of metadata file names a node directory may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataFile {
    JobId,
    JobMode,
    Lock,
    Timestamp,
    Versions,
    Args,
    Outs,
    Complete,
    Errors,
    Assert,
    Heartbeat,
    Stdout,
    Stderr,
    Perf,
    FinalState,
    MetadataZip,
    UiPort,
    UuidFile,
}

impl MetadataFile {
    fn file_name(self) -> &'static str {
        match self {
            MetadataFile::JobId => "_jobid",
            MetadataFile::JobMode => "_jobmode",
            MetadataFile::Lock => "_lock",
            MetadataFile::Timestamp => "_timestamp",
            MetadataFile::Versions => "_versions",
            MetadataFile::Args => "_args",
            MetadataFile::Outs => "_outs",
            MetadataFile::Complete => "_complete",
            MetadataFile::Errors => "_errors",
            MetadataFile::Assert => "_assert",
            MetadataFile::Heartbeat => "_heartbeat",
            MetadataFile::Stdout => "_stdout",
            MetadataFile::Stderr => "_stderr",
            MetadataFile::Perf => "_perf",
            MetadataFile::FinalState => "_finalstate",
            MetadataFile::MetadataZip => "_metadata.zip",
            MetadataFile::UiPort => "_uiport",
            MetadataFile::UuidFile => "_uuid",
        }
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A node's metadata directory.
///
/// `MetadataStore` does not cache file contents; every query re-reads the
/// filesystem. Node state evaluation re-runs `exists`/`read` each scheduler
/// tick and correctness depends on seeing the latest write, including ones
/// made by a job running in a separate process.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file: MetadataFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    pub fn ensure_dir(&self) -> Result<(), MetadataError> {
        fs::create_dir_all(&self.dir).map_err(|source| MetadataError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    pub fn exists(&self, file: MetadataFile) -> bool {
        self.path_of(file).is_file()
    }

    pub fn read_string(&self, file: MetadataFile) -> Result<Option<String>, MetadataError> {
        let path = self.path_of(file);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MetadataError::Io { path, source }),
        }
    }

    pub fn read_json<T: DeserializeOwned>(&self, file: MetadataFile) -> Result<Option<T>, MetadataError> {
        let Some(raw) = self.read_string(file)? else {
            return Ok(None);
        };
        let path = self.path_of(file);
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| MetadataError::Json { path, source })
    }

    pub fn write_string(&self, file: MetadataFile, contents: &str) -> Result<(), MetadataError> {
        self.ensure_dir()?;
        let path = self.path_of(file);
        atomic_write(&path, contents.as_bytes()).map_err(|source| MetadataError::Io { path, source })
    }

    pub fn write_json<T: Serialize>(&self, file: MetadataFile, value: &T) -> Result<(), MetadataError> {
        let path = self.path_of(file);
        let rendered = serde_json::to_string_pretty(value).map_err(|source| MetadataError::Json {
            path: path.clone(),
            source,
        })?;
        self.write_string(file, &rendered)
    }

    /// Touch `_timestamp`/`_heartbeat` with the current instant, recorded as
    /// an opaque string — callers own the clock so tests stay deterministic.
    pub fn write_timestamp(&self, file: MetadataFile, rendered: &str) -> Result<(), MetadataError> {
        self.write_string(file, rendered)
    }

    pub fn remove(&self, file: MetadataFile) -> Result<(), MetadataError> {
        let path = self.path_of(file);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MetadataError::Io { path, source }),
        }
    }

    /// Compress the node's terminal metadata (perf, stdout, stderr, outs)
    /// into `_metadata.zip` once the node completes, mirroring the
    /// zstd-level-3 tradeoff used for background checkpoints. A file-typed
    /// output bound from an upstream fork lives here as a symlink rather
    /// than a copy, so the bundle records the link's target alongside the
    /// files it can read directly.
    pub fn archive_terminal_files(&self) -> Result<(), MetadataError> {
        let mut bundle = Vec::new();
        for file in [
            MetadataFile::Outs,
            MetadataFile::Perf,
            MetadataFile::Stdout,
            MetadataFile::Stderr,
        ] {
            if let Some(contents) = self.read_string(file)? {
                bundle.push(format!("--- {} ---\n{}", file.file_name(), contents));
            }
        }
        for (link, target) in self.symlinks()? {
            let name = link.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            bundle.push(format!("--- symlink {} -> {} ---", name, target.display()));
        }
        let joined = bundle.join("\n");
        let compressed = zstd::encode_all(joined.as_bytes(), 3).map_err(|source| MetadataError::Io {
            path: self.path_of(MetadataFile::MetadataZip),
            source,
        })?;
        let path = self.path_of(MetadataFile::MetadataZip);
        atomic_write(&path, &compressed).map_err(|source| MetadataError::Io { path, source })
    }

    /// Enumerate chunk subdirectories (`chnk0`, `chnk1`, ...) in creation order.
    pub fn chunk_dirs(&self) -> Result<Vec<PathBuf>, MetadataError> {
        let pattern = self.dir.join("chnk*");
        let pattern_str = pattern.to_string_lossy().into_owned();
        let mut dirs: Vec<PathBuf> = glob::glob(&pattern_str)
            .map_err(|e| MetadataError::Io {
                path: self.dir.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
            })?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Enumerate symlinks directly inside the node's directory, paired
    /// with their resolved targets. A plain `read_dir` can't tell a
    /// symlinked output from a regular file, and the volatile-deletion
    /// policy must not unlink a symlink's target along with the link.
    pub fn symlinks(&self) -> Result<Vec<(PathBuf, PathBuf)>, MetadataError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(MetadataError::Io { path: self.dir.clone(), source }),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| MetadataError::Io { path: self.dir.clone(), source })?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|source| MetadataError::Io { path: path.clone(), source })?;
            if file_type.is_symlink() {
                let target = fs::read_link(&path).map_err(|source| MetadataError::Io { path: path.clone(), source })?;
                out.push((path, target));
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Write-then-rename so a reader never observes a partially written file.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
