// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mro_jobmanager::FakeJobManager;
use tempfile::tempdir;

fn spec_for(tag: &str, chunk: Option<u32>) -> JobSpec {
    JobSpec {
        job_name: format!("{}-{:?}", tag, chunk),
        threads: 1,
        mem_gb: 1,
        cmd: vec!["mro".to_string()],
        stdout_path: "/tmp/stdout".into(),
        stderr_path: "/tmp/stderr".into(),
    }
}

#[tokio::test]
async fn an_unsplit_fork_runs_straight_through_to_complete() {
    let dir = tempdir().unwrap();
    let metadata = MetadataStore::new(dir.path());
    let manager = FakeJobManager::new(ResourceSnapshot::default());
    let mut available = ResourceSnapshot { available_threads: 4, available_mem_gb: 8 };
    let mut fork =
        Fork::new(0, Vec::new(), metadata.clone(), false, ResourceRequest { threads: 1, mem_gb: 1 }, Vec::new());
    fork.mark_ready();
    assert_eq!(fork.phase, ForkPhase::Unsplit);

    fork.step(&manager, &mut available, &spec_for, &|_| unreachable!()).await.unwrap();
    assert_eq!(fork.state(), NodeState::Queued);
    assert_eq!(available.available_threads, 3);

    metadata.write_string(MetadataFile::Complete, "").unwrap();
    fork.step(&manager, &mut available, &spec_for, &|_| unreachable!()).await.unwrap();
    assert_eq!(fork.state(), NodeState::Complete);
}

#[tokio::test]
async fn a_disabled_fork_reports_disabled_state() {
    let dir = tempdir().unwrap();
    let metadata = MetadataStore::new(dir.path());
    let mut fork = Fork::new(0, Vec::new(), metadata, false, ResourceRequest::default(), Vec::new());
    fork.mark_disabled();
    assert_eq!(fork.state(), NodeState::DisabledState);
}

#[tokio::test]
async fn a_chunked_fork_progresses_through_split_chunks_and_join() {
    let dir = tempdir().unwrap();
    let metadata = MetadataStore::new(dir.path());
    let manager = FakeJobManager::new(ResourceSnapshot::default());
    let mut available = ResourceSnapshot { available_threads: 8, available_mem_gb: 16 };
    let chunk_dir_a = tempdir().unwrap();
    let chunk_dir_b = tempdir().unwrap();
    let chunk_store_a = MetadataStore::new(chunk_dir_a.path());
    let chunk_store_b = MetadataStore::new(chunk_dir_b.path());
    let stores_for_closure = [chunk_store_a.clone(), chunk_store_b.clone()];
    let metadata_for_chunk = move |idx: u32| stores_for_closure[idx as usize].clone();

    let mut fork = Fork::new(
        0,
        Vec::new(),
        metadata.clone(),
        true,
        ResourceRequest { threads: 1, mem_gb: 1 },
        Vec::new(),
    );
    fork.mark_ready();
    assert_eq!(fork.phase, ForkPhase::Split);

    // Split job is admitted, then completes and writes its chunk defs.
    fork.step(&manager, &mut available, &spec_for, &metadata_for_chunk).await.unwrap();
    assert_eq!(fork.slot.state, NodeState::Queued);
    metadata
        .write_json(MetadataFile::Outs, &serde_json::json!({ "chunks": [{"i": 0}, {"i": 1}] }))
        .unwrap();
    metadata.write_string(MetadataFile::Complete, "").unwrap();
    fork.step(&manager, &mut available, &spec_for, &metadata_for_chunk).await.unwrap();
    assert_eq!(fork.phase, ForkPhase::Chunks);
    assert_eq!(fork.chunks.len(), 2);
    assert_eq!(chunk_store_a.read_json::<serde_json::Value>(MetadataFile::Args).unwrap().unwrap(), serde_json::json!({"i": 0}));

    // Both chunks get admitted on this tick.
    fork.step(&manager, &mut available, &spec_for, &metadata_for_chunk).await.unwrap();
    chunk_store_a.write_string(MetadataFile::Complete, "").unwrap();
    chunk_store_b.write_string(MetadataFile::Complete, "").unwrap();

    // Observe completion and transition into Join.
    fork.step(&manager, &mut available, &spec_for, &metadata_for_chunk).await.unwrap();
    assert_eq!(fork.phase, ForkPhase::Join);
    assert_eq!(fork.state(), NodeState::Ready);

    fork.step(&manager, &mut available, &spec_for, &metadata_for_chunk).await.unwrap();
    metadata.write_string(MetadataFile::Complete, "").unwrap();
    fork.step(&manager, &mut available, &spec_for, &metadata_for_chunk).await.unwrap();
    assert_eq!(fork.state(), NodeState::Complete);
}

#[test]
fn aggregating_an_empty_chunk_set_is_waiting() {
    assert_eq!(aggregate_chunk_states(&[]), NodeState::Waiting);
}

#[test]
fn any_failed_chunk_fails_the_aggregate() {
    let dir = tempdir().unwrap();
    let mut ok = Slot::new(ResourceRequest::default());
    ok.state = NodeState::Complete;
    let mut bad = Slot::new(ResourceRequest::default());
    bad.state = NodeState::Failed;
    let chunks = vec![
        ChunkState { index: 0, metadata: MetadataStore::new(dir.path()), slot: ok },
        ChunkState { index: 1, metadata: MetadataStore::new(dir.path()), slot: bad },
    ];
    assert_eq!(aggregate_chunk_states(&chunks), NodeState::Failed);
}
