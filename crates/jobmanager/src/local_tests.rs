// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[tokio::test]
async fn submitting_a_job_runs_it_to_completion() {
    let dir = tempdir().unwrap();
    let manager = LocalJobManager::new(4, 8);
    let spec = JobSpec {
        job_name: "a".to_string(),
        threads: 1,
        mem_gb: 1,
        cmd: vec!["true".to_string()],
        stdout_path: dir.path().join("stdout"),
        stderr_path: dir.path().join("stderr"),
    };

    let handle = manager.submit(&spec).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!manager.is_alive(&handle));
}

#[tokio::test]
async fn refresh_resources_reports_the_configured_ceiling() {
    let manager = LocalJobManager::new(4, 8);
    let snapshot = manager.refresh_resources().await.unwrap();
    assert_eq!(snapshot.available_threads, 4);
    assert_eq!(snapshot.available_mem_gb, 8);
}

#[tokio::test]
async fn local_mode_reports_no_queue_check() {
    let manager = LocalJobManager::new(4, 8);
    assert!(!manager.has_queue_check());
    assert!(manager.check_queue(&["1".to_string()]).await.unwrap().is_empty());
}

#[tokio::test]
async fn an_unknown_handle_is_not_alive() {
    let manager = LocalJobManager::new(4, 8);
    assert!(!manager.is_alive(&JobHandle("999999999".to_string())));
}
