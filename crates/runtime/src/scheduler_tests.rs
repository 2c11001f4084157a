// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::binder::bind;
use mro_compiler::CompileResult;
use mro_jobmanager::FakeJobManager;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn compiled(src: &str) -> mro_core::CompiledAst {
    match mro_compiler::compile_str(src, "test.mro") {
        CompileResult::Ok(compiled) => compiled,
        other => panic!("expected a successful compile, got {:?}", other),
    }
}

#[tokio::test]
async fn a_single_stage_pipestance_completes_once_its_job_does() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        call STAGE_A(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (mut graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = RuntimeContext::new(manager.clone())
        .with_disk_space_threshold_bytes(0)
        .with_heartbeat_interval(Duration::ZERO);

    let state = tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(state, NodeState::Queued);

    // A fake job manager reports a freshly-submitted job as Running by
    // default, so the slot needs one more tick before it is watching a
    // terminal transition at all.
    let state = tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(state, NodeState::Running);

    let handle = graph.get(root).forks[0].slot.job_handle.clone().unwrap();
    manager.complete(&handle.0);
    let state = tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(state, NodeState::Complete);
}

#[tokio::test]
async fn a_pipeline_root_aggregates_its_children() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        stage STAGE_B(in string y, out string z)
        {
            src py "b.py"
        }
        pipeline PIPE(in int x, out string z)
        {
            call STAGE_A a(x = self.x)
            call STAGE_B b(y = a.y)
            return (z = b.z)
        }
        call PIPE(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (mut graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = RuntimeContext::new(manager.clone())
        .with_disk_space_threshold_bytes(0)
        .with_heartbeat_interval(Duration::ZERO);

    // `a` is queued while `b` still waits on it, so the pipeline's own
    // composite state is the generic "in progress, not uniform" label.
    let state = tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(state, NodeState::ForkWaiting);

    let a = *graph.get(root).children.get("a").unwrap();
    let b = *graph.get(root).children.get("b").unwrap();
    assert_eq!(graph.get(b).state, NodeState::Waiting);

    tick(&mut graph, root, &ctx).await.unwrap();
    let a_handle = graph.get(a).forks[0].slot.job_handle.clone().unwrap();
    manager.complete(&a_handle.0);
    tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(graph.get(a).state, NodeState::Complete);
}

#[tokio::test]
async fn a_queue_probe_inside_the_heartbeat_window_is_skipped() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        call STAGE_A(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (mut graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    // Default heartbeat interval (five minutes), so the second tick below
    // falls well inside the window and its queue probe must be skipped.
    let ctx = RuntimeContext::new(manager.clone()).with_disk_space_threshold_bytes(0);

    let state = tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(state, NodeState::Queued);

    // The job is already running as far as the fake manager is concerned,
    // but the gate should still be holding the window from the first tick's
    // probe, so this tick must not observe it.
    let state = tick(&mut graph, root, &ctx).await.unwrap();
    assert_eq!(state, NodeState::Queued);
}

#[tokio::test]
async fn a_disk_space_shortfall_fails_the_tick() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        call STAGE_A(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (mut graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot::default()));
    let ctx = RuntimeContext::new(manager).with_disk_space_threshold_bytes(u64::MAX);

    let result = tick(&mut graph, root, &ctx).await;
    assert!(matches!(result, Err(RuntimeError::DiskFull { .. })));
}
