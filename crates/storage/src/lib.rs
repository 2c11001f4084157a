// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Directory-backed metadata storage for pipestances.
//!
//! Each node in a pipestance tree owns a directory on disk holding a fixed
//! vocabulary of small files (`_jobid`, `_complete`, `_errors`, ...). This
//! crate provides typed access to that vocabulary plus the pipestance lock
//! file and recovery helpers that scan a tree for leftover in-flight state.

mod disk;
mod lock;
mod metadata;
mod recovery;

pub use disk::free_space_bytes;
pub use lock::{LockError, PipestanceLock};
pub use metadata::{MetadataError, MetadataFile, MetadataStore};
pub use recovery::{classify_node, classify_transient, reset_node_dir, RecoveryAction, TransientKind};

mro_core::define_id! {
    /// Identifies a single pipestance (one invocation of a top-level call).
    pub struct PipestanceId;
}
