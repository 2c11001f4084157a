// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `onfinish` lifecycle hook dispatch (§6 "Lifecycle hook"): a shell command
//! invoked with the pipestance path, terminal state, pipestance id, and
//! (when failed) a relative error file path as positional arguments.

use std::path::Path;
use std::process::Command;

use mro_runtime::NodeState;

pub fn dispatch(cmd: &str, pipestance_dir: &Path, state: NodeState, psid: &str, error_file: Option<&Path>) {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd).arg("sh");
    command.arg(pipestance_dir);
    command.arg(state.to_string());
    command.arg(psid);
    if let Some(path) = error_file {
        command.arg(path);
    }
    match command.status() {
        Ok(status) if !status.success() => {
            tracing::warn!(%status, "onfinish hook exited non-zero");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "failed to launch onfinish hook");
        }
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
