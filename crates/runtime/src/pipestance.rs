// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One running invocation of a top-level call: the bound node tree plus
//! the on-disk identity and exclusivity lock that make it a pipestance
//! rather than just a graph in memory (§3 "Runtime entities" / Pipestance,
//! §4.8 "Reattach / recovery").

use std::path::PathBuf;

use mro_core::{Clock, CompiledAst, IdGen};
use mro_jobmanager::JobMode;
use mro_storage::{
    classify_node, reset_node_dir, MetadataFile, MetadataStore, PipestanceId, PipestanceLock,
    RecoveryAction,
};

use crate::binder::bind;
use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::graph::{Graph, NodeId};
use crate::scheduler;
use crate::NodeState;

pub struct Pipestance {
    pub id: PipestanceId,
    pub graph: Graph,
    pub root: NodeId,
    pub job_mode: JobMode,
    lock: Option<PipestanceLock>,
}

impl Pipestance {
    /// Bind a fresh pipestance under `root_dir`, acquiring its lock and
    /// writing the identity files a daemon or `mro` invocation expects to
    /// find there.
    pub fn create(
        compiled: &CompiledAst,
        root_dir: PathBuf,
        job_mode: JobMode,
        id_gen: &dyn IdGen,
        clock: &dyn Clock,
    ) -> Result<Self, RuntimeError> {
        let lock = PipestanceLock::acquire(root_dir.join("_lock"))?;
        let (graph, root) = bind(compiled, root_dir.clone())?;
        let id = PipestanceId::new(id_gen.next());
        let metadata = MetadataStore::new(&root_dir);
        metadata.write_string(MetadataFile::UuidFile, id.as_str())?;
        metadata.write_string(MetadataFile::JobMode, &job_mode.to_string())?;
        metadata.write_timestamp(MetadataFile::Timestamp, &clock.epoch_ms().to_string())?;
        Ok(Self { id, graph, root, job_mode, lock: Some(lock) })
    }

    /// Re-attach to an existing pipestance directory, applying recovery
    /// actions to every stage node left mid-flight by a prior daemon.
    /// Fails if the directory was last driven under a different job mode,
    /// since a `local` job's pid means nothing to an `sge` reattach and
    /// vice versa.
    pub fn reattach(compiled: &CompiledAst, root_dir: PathBuf, job_mode: JobMode) -> Result<Self, RuntimeError> {
        let lock = PipestanceLock::acquire(root_dir.join("_lock"))?;
        let metadata = MetadataStore::new(&root_dir);
        if let Some(found) = metadata.read_string(MetadataFile::JobMode)? {
            let expected = job_mode.to_string();
            if found != expected {
                return Err(RuntimeError::JobModeMismatch { expected, found });
            }
        }
        let id = metadata
            .read_string(MetadataFile::UuidFile)?
            .map(PipestanceId::new)
            .unwrap_or_else(|| PipestanceId::new("unknown"));
        let (mut graph, root) = bind(compiled, root_dir)?;
        reconcile(&mut graph, job_mode)?;
        Ok(Self { id, graph, root, job_mode, lock: Some(lock) })
    }

    /// Advance one scheduling tick.
    pub async fn step(&mut self, ctx: &RuntimeContext) -> Result<NodeState, RuntimeError> {
        scheduler::tick(&mut self.graph, self.root, ctx).await
    }

    pub fn state(&self) -> NodeState {
        self.graph.get(self.root).state
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Finalize a terminal pipestance by writing each node's `_finalstate`
    /// and bundling its terminal files into `_metadata.zip` (glossary:
    /// "Immortalize"). A no-op before the pipestance reaches a terminal
    /// state. Idempotent: a node whose `_finalstate` already exists is
    /// skipped, so calling this twice writes each artifact at most once.
    pub fn immortalize(&self) -> Result<(), RuntimeError> {
        if !self.is_finished() {
            return Ok(());
        }
        for node in self.graph.iter() {
            if node.metadata.exists(MetadataFile::FinalState) {
                continue;
            }
            node.metadata.write_string(MetadataFile::FinalState, &node.state.to_string())?;
            node.metadata.archive_terminal_files()?;
        }
        Ok(())
    }

    /// The path to the first fork-level `_errors` file under a failed
    /// pipestance, relative to the pipestance root, for the `onfinish` hook's
    /// fourth argument.
    pub fn first_error_file(&self, root_dir: &std::path::Path) -> Option<PathBuf> {
        for node in self.graph.iter() {
            for fork in &node.forks {
                if fork.metadata.exists(MetadataFile::Errors) {
                    let path = fork.metadata.path_of(MetadataFile::Errors);
                    return path.strip_prefix(root_dir).map(|p| p.to_path_buf()).ok().or(Some(path));
                }
            }
        }
        None
    }

    /// Release the pipestance lock, letting another daemon attach to this
    /// directory. Dropping a `Pipestance` without calling this still
    /// releases the lock (the file handle closes), but callers that need
    /// to hand the directory to a reattach in the same process should call
    /// this explicitly first.
    pub fn release(&mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
    }
}

/// Apply the reattach recovery policy to every stage node's forks: a fork
/// left with `_jobid` but no terminal file gets its job bookkeeping wiped
/// so the scheduler resubmits it (§4.8).
fn reconcile(graph: &mut Graph, job_mode: JobMode) -> Result<(), RuntimeError> {
    let job_mode_local = job_mode == JobMode::Local;
    for id in graph.stage_node_ids() {
        for fork in &graph.get(id).forks {
            let action = classify_node(&fork.metadata, job_mode_local, false);
            if matches!(action, RecoveryAction::RestartRunningNodes | RecoveryAction::RestartLocalJobs) {
                reset_node_dir(&fork.metadata)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "pipestance_tests.rs"]
mod tests;
