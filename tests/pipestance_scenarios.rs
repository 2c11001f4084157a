// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios driven through the public `mro-runtime` surface
//! (§8 "Scenarios"), plus integration-level assertions of the invariants
//! that only hold once compiler, storage, jobmanager, and runtime are
//! wired together.

use std::sync::Arc;
use std::time::Duration;

use mro_compiler::CompileResult;
use mro_core::{CompiledAst, FakeClock, SequentialIdGen};
use mro_jobmanager::{FakeJobManager, JobMode, ResourceSnapshot};
use mro_runtime::{NodeState, Pipestance, RuntimeContext, RuntimeError};
use mro_storage::{classify_transient, MetadataFile, MetadataStore, TransientKind};
use tempfile::tempdir;

fn compiled(src: &str) -> CompiledAst {
    match mro_compiler::compile_str(src, "test.mro") {
        CompileResult::Ok(compiled) => compiled,
        other => panic!("expected a successful compile, got {:?}", other),
    }
}

fn local_ctx(manager: Arc<FakeJobManager>) -> RuntimeContext {
    RuntimeContext::new(manager).with_disk_space_threshold_bytes(0).with_heartbeat_interval(Duration::ZERO)
}

const SINGLE_STAGE: &str = r#"
    stage STAGE_A(in int x, out string y)
    {
        src py "a.py"
    }
    call STAGE_A(x = 3)
"#;

/// S1: a single-stage pipestance runs to `Complete` once its one job does,
/// and its output persists under `_outs` for downstream readers.
#[tokio::test]
async fn s1_single_stage_pipeline_completes_with_the_stubs_output() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps =
        Pipestance::create(&compiled(SINGLE_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock).unwrap();

    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = local_ctx(manager.clone());

    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Queued);
    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Running);

    let fork_metadata = ps.graph.get(ps.root).forks[0].metadata.clone();
    let handle = ps.graph.get(ps.root).forks[0].slot.job_handle.clone().unwrap();
    fork_metadata.write_string(MetadataFile::Outs, r#"{"y": "canned"}"#).unwrap();
    fork_metadata.write_string(MetadataFile::Complete, "").unwrap();
    manager.complete(&handle.0);

    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Complete);
    assert_eq!(ps.state(), NodeState::Complete);

    let outs = fork_metadata.read_string(MetadataFile::Outs).unwrap().unwrap();
    assert!(outs.contains("canned"));

    ps.immortalize().unwrap();
    assert!(fork_metadata.exists(MetadataFile::FinalState));
}

const CHUNKED_STAGE: &str = r#"
    stage STAGE_SPLIT(in int x, out string y)
    {
        src py "splitter.py"
        split
    }
    call STAGE_SPLIT(x = 3)
"#;

/// S4: a split-enabled stage runs its split job, fans out two chunk jobs
/// that progress concurrently, and joins once both finish.
#[tokio::test]
async fn s4_chunked_stage_runs_both_chunks_and_joins_to_complete() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps = Pipestance::create(&compiled(CHUNKED_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock)
        .unwrap();

    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = local_ctx(manager.clone());

    // Split job admitted.
    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Queued);

    let fork_metadata = ps.graph.get(ps.root).forks[0].metadata.clone();
    let split_handle = ps.graph.get(ps.root).forks[0].slot.job_handle.clone().unwrap();
    fork_metadata
        .write_json(MetadataFile::Outs, &serde_json::json!({ "chunks": [{"i": 0}, {"i": 1}] }))
        .unwrap();
    fork_metadata.write_string(MetadataFile::Complete, "").unwrap();
    manager.complete(&split_handle.0);

    // Split observed complete, fans out two chunk jobs and admits both
    // within the same thread/mem budget.
    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Queued);
    assert_eq!(ps.graph.get(ps.root).forks[0].chunks.len(), 2);

    let chunk_handles: Vec<_> = ps.graph.get(ps.root).forks[0]
        .chunks
        .iter()
        .map(|c| (c.metadata.clone(), c.slot.job_handle.clone().unwrap()))
        .collect();
    for (metadata, handle) in &chunk_handles {
        metadata.write_string(MetadataFile::Complete, "").unwrap();
        manager.complete(&handle.0);
    }

    // Both chunks observed complete; fork moves into Join.
    ps.step(&ctx).await.unwrap();
    assert_eq!(ps.graph.get(ps.root).forks[0].phase, mro_runtime::ForkPhase::Join);

    // Join job admitted, then completes.
    ps.step(&ctx).await.unwrap();
    let join_handle = ps.graph.get(ps.root).forks[0].join_slot.as_ref().unwrap().job_handle.clone().unwrap();
    fork_metadata.write_string(MetadataFile::Complete, "").unwrap();
    manager.complete(&join_handle.0);

    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Complete);
}

/// S5: a node left `Running` with no live job (a crashed daemon) resets on
/// reattach and resubmits cleanly on the next step.
#[tokio::test]
async fn s5_orphaned_running_node_recovers_on_reattach() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps =
        Pipestance::create(&compiled(SINGLE_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock).unwrap();

    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = local_ctx(manager.clone());
    ps.step(&ctx).await.unwrap();
    assert_eq!(ps.state(), NodeState::Queued);
    // Simulate the daemon dying mid-run: the lock goes away but the
    // fork's `_jobid` is left behind with no `_complete`/`_errors`.
    ps.release();

    let compiled_ast = compiled(SINGLE_STAGE);
    let mut ps2 = Pipestance::reattach(&compiled_ast, dir.path().to_path_buf(), JobMode::Local).unwrap();
    assert!(!ps2.graph.get(ps2.root).forks[0].metadata.exists(MetadataFile::JobId));
    assert_eq!(ps2.graph.get(ps2.root).forks[0].state(), NodeState::Waiting);

    let manager2 = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx2 = local_ctx(manager2.clone());
    assert_eq!(ps2.step(&ctx2).await.unwrap(), NodeState::Queued);

    let fork_metadata = ps2.graph.get(ps2.root).forks[0].metadata.clone();
    let handle = ps2.graph.get(ps2.root).forks[0].slot.job_handle.clone().unwrap();
    fork_metadata.write_string(MetadataFile::Complete, "").unwrap();
    manager2.complete(&handle.0);
    ps2.step(&ctx2).await.unwrap();
    assert_eq!(ps2.step(&ctx2).await.unwrap(), NodeState::Complete);
}

/// S6: a stage's error file carrying a resource-exhaustion marker
/// classifies as transient, surfacing its own log line as the message.
#[test]
fn s6_a_resource_exhaustion_error_classifies_as_transient() {
    let dir = tempdir().unwrap();
    let metadata = MetadataStore::new(dir.path());
    let log_line = "stage failed: no space left on device while writing outs";
    metadata.write_string(MetadataFile::Errors, log_line).unwrap();

    let recorded = metadata.read_string(MetadataFile::Errors).unwrap().unwrap();
    assert_eq!(recorded, log_line);
    assert_eq!(classify_transient(&recorded), TransientKind::Transient);
}

#[test]
fn s6_a_stage_assertion_failure_classifies_as_permanent() {
    let log_line = "AssertionError: expected output file to exist";
    assert_eq!(classify_transient(log_line), TransientKind::Permanent);
}

/// Invariant 5: a disk-space shortfall fails the tick rather than silently
/// skipping admission.
#[tokio::test]
async fn invariant_disk_space_shortfall_surfaces_as_an_error() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps =
        Pipestance::create(&compiled(SINGLE_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock).unwrap();
    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot::default()));
    let ctx = RuntimeContext::new(manager).with_disk_space_threshold_bytes(u64::MAX);

    let result = ps.step(&ctx).await;
    assert!(matches!(result, Err(RuntimeError::DiskFull { .. })));
}

/// Invariant 6: reattaching under a different job mode than the pipestance
/// was created with is rejected outright rather than silently migrated.
#[test]
fn invariant_reattach_rejects_a_mismatched_job_mode() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps =
        Pipestance::create(&compiled(SINGLE_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock).unwrap();
    ps.release();

    let compiled_ast = compiled(SINGLE_STAGE);
    let result = Pipestance::reattach(&compiled_ast, dir.path().to_path_buf(), JobMode::Sge);
    assert!(matches!(result, Err(RuntimeError::JobModeMismatch { .. })));
}

/// Invariant 7: a failed fork fails the whole pipestance rather than
/// letting the rest of the graph limp to a false `Complete`.
#[tokio::test]
async fn invariant_a_single_failed_fork_fails_the_whole_pipestance() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps =
        Pipestance::create(&compiled(SINGLE_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock).unwrap();

    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = local_ctx(manager);
    ps.step(&ctx).await.unwrap();

    let fork_metadata = ps.graph.get(ps.root).forks[0].metadata.clone();
    fork_metadata.write_string(MetadataFile::Errors, "boom").unwrap();

    assert_eq!(ps.step(&ctx).await.unwrap(), NodeState::Failed);
    assert_eq!(ps.state(), NodeState::Failed);

    ps.immortalize().unwrap();
    let first_error = ps.first_error_file(dir.path());
    assert_eq!(first_error.as_ref().and_then(|p| p.file_name()), Some(std::ffi::OsStr::new("_errors")));
}

/// Invariant 9 (idempotent immortalize): calling `immortalize` twice on a
/// terminal pipestance writes each node's `_finalstate` at most once.
#[tokio::test]
async fn invariant_immortalize_is_idempotent_across_the_whole_graph() {
    let dir = tempdir().unwrap();
    let id_gen = SequentialIdGen::new("psid");
    let clock = FakeClock::new(1_000);
    let mut ps =
        Pipestance::create(&compiled(SINGLE_STAGE), dir.path().to_path_buf(), JobMode::Local, &id_gen, &clock).unwrap();

    let manager = Arc::new(FakeJobManager::new(ResourceSnapshot { available_threads: 8, available_mem_gb: 16 }));
    let ctx = local_ctx(manager.clone());
    ps.step(&ctx).await.unwrap();
    ps.step(&ctx).await.unwrap();
    let fork_metadata = ps.graph.get(ps.root).forks[0].metadata.clone();
    let handle = ps.graph.get(ps.root).forks[0].slot.job_handle.clone().unwrap();
    fork_metadata.write_string(MetadataFile::Complete, "").unwrap();
    manager.complete(&handle.0);
    ps.step(&ctx).await.unwrap();
    assert_eq!(ps.state(), NodeState::Complete);

    ps.immortalize().unwrap();
    let first_write = fork_metadata.read_string(MetadataFile::FinalState).unwrap().unwrap();
    std::fs::remove_file(fork_metadata.path_of(MetadataFile::MetadataZip)).unwrap();

    ps.immortalize().unwrap();
    assert!(!fork_metadata.exists(MetadataFile::MetadataZip));
    assert_eq!(fork_metadata.read_string(MetadataFile::FinalState).unwrap().unwrap(), first_write);
}
