// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec(name: &str) -> JobSpec {
    JobSpec {
        job_name: name.to_string(),
        threads: 1,
        mem_gb: 1,
        cmd: vec!["mro".to_string()],
        stdout_path: "/tmp/stdout".into(),
        stderr_path: "/tmp/stderr".into(),
    }
}

#[tokio::test]
async fn submitted_jobs_start_as_running_until_marked_complete() {
    let manager = FakeJobManager::new(ResourceSnapshot { available_threads: 4, available_mem_gb: 8 });
    let handle = manager.submit(&spec("a")).await.unwrap();

    let states = manager.check_queue(&[handle.0.clone()]).await.unwrap();
    assert_eq!(states.get(&handle.0), Some(&QueueState::Running));

    manager.complete(&handle.0);
    let states = manager.check_queue(&[handle.0.clone()]).await.unwrap();
    assert_eq!(states.get(&handle.0), Some(&QueueState::Done));
}

#[tokio::test]
async fn submitted_specs_are_recorded_for_assertions() {
    let manager = FakeJobManager::new(ResourceSnapshot::default());
    manager.submit(&spec("a")).await.unwrap();
    manager.submit(&spec("b")).await.unwrap();
    let names: Vec<_> = manager.submitted_specs().into_iter().map(|s| s.job_name).collect();
    assert_eq!(names, vec!["a", "b"]);
}
