// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The five-step pipestance scheduling loop (§4.7): a disk-space check, a
//! resource refresh, one step of every stage node's forks, a cache clear
//! (a no-op here: `MetadataStore` re-reads the filesystem on every call by
//! design, so there is nothing to invalidate), and a bottom-up state
//! aggregation pass.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use mro_jobmanager::{JobHandle, JobManager, JobManagerError, JobMode, JobSpec, QueueState, ResourceSnapshot};
use mro_storage::MetadataStore;

use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::graph::{Graph, NodeId};
use crate::node::NodeKind;
use crate::NodeState;

/// Wraps the pipestance's job manager for one tick so every fork's queue
/// probe shares a single rate-limit decision (§5 "at most one probe in
/// flight", §8 invariant 6) instead of each slot deciding independently.
struct GatedJobManager<'a> {
    inner: &'a dyn JobManager,
    probe_allowed: bool,
}

#[async_trait]
impl JobManager for GatedJobManager<'_> {
    fn job_mode(&self) -> JobMode {
        self.inner.job_mode()
    }

    async fn refresh_resources(&self) -> Result<ResourceSnapshot, JobManagerError> {
        self.inner.refresh_resources().await
    }

    fn has_queue_check(&self) -> bool {
        self.inner.has_queue_check()
    }

    async fn check_queue(&self, job_ids: &[String]) -> Result<HashMap<String, QueueState>, JobManagerError> {
        if !self.probe_allowed {
            return Ok(HashMap::new());
        }
        self.inner.check_queue(job_ids).await
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle, JobManagerError> {
        self.inner.submit(spec).await
    }
}

/// Fold a set of sibling states into one composed state, used both for a
/// fork's chunk sub-phases and for a node's forks/children (§4.3, §4.7).
pub fn aggregate_state<I: IntoIterator<Item = NodeState>>(states: I) -> NodeState {
    let states: Vec<NodeState> = states.into_iter().collect();
    if states.is_empty() {
        return NodeState::Waiting;
    }
    if states.iter().any(|s| *s == NodeState::Failed) {
        return NodeState::Failed;
    }
    if states.iter().any(|s| *s == NodeState::Running) {
        return NodeState::Running;
    }
    if states.iter().all(|s| *s == NodeState::DisabledState) {
        return NodeState::DisabledState;
    }
    if states.iter().all(|s| matches!(s, NodeState::Complete | NodeState::DisabledState)) {
        return NodeState::Complete;
    }
    NodeState::ForkWaiting
}

/// Fold a stage node's own forks into the node's state. A single
/// unswept fork's state passes straight through so a stage node reads
/// as Queued/Running rather than the generic composite label; only a
/// sweep with forks in genuinely different phases collapses to
/// `ForkWaiting`.
fn aggregate_fork_states(states: &[NodeState]) -> NodeState {
    match states {
        [] => NodeState::Waiting,
        [only] => *only,
        many => aggregate_state(many.iter().copied()),
    }
}

/// Advance every stage node by one tick and recompute every derived
/// (pipeline) node's state bottom-up, returning the root's resulting
/// state.
pub async fn tick(graph: &mut Graph, root: NodeId, ctx: &RuntimeContext) -> Result<NodeState, RuntimeError> {
    let root_path = graph.get(root).path.clone();
    let free_bytes = mro_storage::free_space_bytes(&root_path).map_err(|source| RuntimeError::Io { path: root_path.clone(), source })?;
    if free_bytes < ctx.disk_space_threshold_bytes {
        return Err(RuntimeError::DiskFull {
            path: root_path.display().to_string(),
            bytes: free_bytes,
            threshold: ctx.disk_space_threshold_bytes,
        });
    }

    let mut available = ctx.job_manager.refresh_resources().await?;

    let now = Instant::now();
    let probe_allowed = ctx.heartbeat_gate.is_due(now);
    if probe_allowed {
        ctx.heartbeat_gate.record_probe(now);
    }
    let gated_manager = GatedJobManager { inner: &*ctx.job_manager, probe_allowed };

    for id in graph.stage_node_ids() {
        step_stage_node(graph, id, &gated_manager, &mut available).await?;
    }

    for id in graph.pipeline_nodes_post_order(root) {
        let child_states: Vec<NodeState> = graph.children_of(id).into_iter().map(|c| graph.get(c).state).collect();
        graph.get_mut(id).state = aggregate_state(child_states);
    }

    Ok(graph.get(root).state)
}

async fn step_stage_node(
    graph: &mut Graph,
    id: NodeId,
    job_manager: &dyn JobManager,
    available: &mut ResourceSnapshot,
) -> Result<(), RuntimeError> {
    if graph.get(id).prereqs_satisfied(graph) {
        for fork in &mut graph.get_mut(id).forks {
            fork.mark_ready();
        }
    }

    let node = graph.get_mut(id);
    let NodeKind::Stage(stage) = node.kind.clone() else {
        return Ok(());
    };
    let src_path = stage.src.path.clone();
    let src_args = stage.src.args.clone();
    let resources = node.resources;
    let job_name = node.fqname.clone();

    for fork in &mut node.forks {
        let cmd_for = |tag: &str, chunk: Option<u32>| -> JobSpec {
            let mut cmd = vec![src_path.clone(), tag.to_string()];
            cmd.extend(src_args.iter().cloned());
            if let Some(idx) = chunk {
                cmd.push(idx.to_string());
            }
            JobSpec {
                job_name: format!("{}.{}", job_name, tag),
                threads: resources.threads,
                mem_gb: resources.mem_gb,
                cmd,
                stdout_path: PathBuf::from("_stdout"),
                stderr_path: PathBuf::from("_stderr"),
            }
        };
        let fork_dir = fork.metadata.dir().to_path_buf();
        let metadata_for_chunk = move |idx: u32| MetadataStore::new(fork_dir.join(format!("chnk{}", idx)));
        fork.step(job_manager, available, &cmd_for, &metadata_for_chunk).await?;
    }

    let node = graph.get_mut(id);
    let fork_states: Vec<NodeState> = node.forks.iter().map(|f| f.state()).collect();
    node.state = aggregate_fork_states(&fork_states);
    Ok(())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
