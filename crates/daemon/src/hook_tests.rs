// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn dispatch_passes_positional_arguments_to_the_hook_command() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("seen_args");
    let cmd = format!("echo \"$1 $2 $3 $4\" > {}", marker.display());

    dispatch(&cmd, dir.path(), NodeState::Complete, "psid-1", Some(std::path::Path::new("err.log")));

    let contents = std::fs::read_to_string(&marker).unwrap();
    assert!(contents.contains("complete"));
    assert!(contents.contains("psid-1"));
    assert!(contents.contains("err.log"));
}

#[test]
fn dispatch_does_not_panic_when_the_command_is_missing() {
    dispatch("this-command-does-not-exist-anywhere", std::path::Path::new("."), NodeState::Failed, "psid-2", None);
}
