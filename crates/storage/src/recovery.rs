// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery helpers applied when a daemon re-attaches to an existing
//! pipestance directory after a restart or an explicit `mro run --reattach`.

use crate::metadata::{MetadataError, MetadataFile, MetadataStore};

/// What a daemon does with a node's on-disk state when it first attaches
/// to a pipestance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Leave the node's files untouched; the node already reached a
    /// terminal state before the daemon stopped.
    Reattach,
    /// A node left `_jobid` without `_complete`/`_errors` when the daemon
    /// died; clear the job bookkeeping so the scheduler resubmits it.
    RestartRunningNodes,
    /// Same as `RestartRunningNodes`, restricted to nodes whose job mode
    /// was `local` (a locally-spawned child process cannot outlive the
    /// daemon across a machine reboot the way a cluster job can).
    RestartLocalJobs,
    /// Wipe a node's metadata directory back to empty so it reruns from
    /// scratch.
    Reset,
    /// A node marked immortal never gets reset even under `Reset`; its
    /// completed outputs are load-bearing for downstream consumers outside
    /// the pipestance.
    Immortalize,
}

/// Inspect a node's metadata directory and decide which recovery action
/// applies. Does not perform the action; callers apply it with
/// `reset_node_dir` or their own job-resubmission logic.
pub fn classify_node(store: &MetadataStore, job_mode_local: bool, immortal: bool) -> RecoveryAction {
    if immortal {
        return RecoveryAction::Immortalize;
    }
    if store.exists(MetadataFile::Complete) || store.exists(MetadataFile::Errors) {
        return RecoveryAction::Reattach;
    }
    if store.exists(MetadataFile::JobId) {
        return if job_mode_local {
            RecoveryAction::RestartLocalJobs
        } else {
            RecoveryAction::RestartRunningNodes
        };
    }
    RecoveryAction::Reattach
}

/// Remove the job-identity files so the scheduler treats the node as never
/// having been submitted. Leaves `_args`/`_outs` declarations untouched.
pub fn reset_node_dir(store: &MetadataStore) -> Result<(), MetadataError> {
    for file in [
        MetadataFile::JobId,
        MetadataFile::JobMode,
        MetadataFile::Lock,
        MetadataFile::Complete,
        MetadataFile::Errors,
        MetadataFile::Assert,
        MetadataFile::Heartbeat,
        MetadataFile::Stdout,
        MetadataFile::Stderr,
        MetadataFile::Perf,
        MetadataFile::FinalState,
    ] {
        store.remove(file)?;
    }
    Ok(())
}

/// Coarse classification of whether an observed failure is worth a
/// bounded number of automatic retries versus surfacing to the user
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Worth retrying: the filesystem or queue hiccuped, not the job itself.
    Transient,
    /// The job's own code failed; retrying would reproduce the same error.
    Permanent,
}

/// Classify an error message against the small set of substrings that
/// indicate a transient filesystem or scheduler condition rather than a
/// failure in the stage code itself.
pub fn classify_transient(message: &str) -> TransientKind {
    const TRANSIENT_MARKERS: &[&str] = &[
        "stale file handle",
        "no space left on device",
        "resource temporarily unavailable",
        "connection reset",
        "could not read job queue",
    ];
    let lower = message.to_ascii_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        TransientKind::Transient
    } else {
        TransientKind::Permanent
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
