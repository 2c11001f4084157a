// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One parametric instantiation of a stage under a sweep-value tuple
//! (§3 "Runtime entities" / Fork, §4.4 "Fork & Chunking").

use mro_core::Literal;
use mro_jobmanager::{JobManager, JobSpec, ResourceSnapshot};
use mro_storage::{MetadataFile, MetadataStore};
use serde::Deserialize;

use crate::error::RuntimeError;
use crate::node::ResourceRequest;
use crate::slot::Slot;
use crate::NodeState;

/// Sub-phase a chunked stage's fork is in; unsplit stages stay in
/// `Unsplit` for their whole life (§4.3 "chunked stage runs three
/// sub-phases per fork").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkPhase {
    Unsplit,
    Split,
    Chunks,
    Join,
}

/// The split job's declared chunk definitions, one element per chunk,
/// picked up from the split job's `Outs` file.
#[derive(Debug, Deserialize)]
struct SplitOuts {
    chunks: Vec<serde_json::Value>,
}

#[derive(Debug)]
pub struct ChunkState {
    pub index: u32,
    pub metadata: MetadataStore,
    pub slot: Slot,
}

#[derive(Debug)]
pub struct Fork {
    pub index: u32,
    pub sweep_values: Vec<Literal>,
    pub metadata: MetadataStore,
    pub phase: ForkPhase,
    pub split: bool,
    /// The fork's own job when unsplit, or the split job when chunked.
    pub slot: Slot,
    pub join_slot: Option<Slot>,
    pub chunks: Vec<ChunkState>,
    /// Output parameter names declared path-typed, tracked for the
    /// volatile-deletion policy (§4.4).
    pub file_outputs: Vec<String>,
}

impl Fork {
    pub fn new(
        index: u32,
        sweep_values: Vec<Literal>,
        metadata: MetadataStore,
        split: bool,
        resources: ResourceRequest,
        file_outputs: Vec<String>,
    ) -> Self {
        Self {
            index,
            sweep_values,
            metadata,
            phase: if split { ForkPhase::Split } else { ForkPhase::Unsplit },
            split,
            slot: Slot::new(resources),
            join_slot: None,
            chunks: Vec::new(),
            file_outputs,
        }
    }

    pub fn mark_ready(&mut self) {
        self.slot.mark_ready();
    }

    pub fn mark_disabled(&mut self) {
        self.slot.mark_disabled();
        for chunk in &mut self.chunks {
            chunk.slot.mark_disabled();
        }
    }

    /// The fork's composed state, aggregating sub-phases for chunked
    /// stages (§4.3: "Sub-phase state composes into the fork's state;
    /// failure in any sub-phase fails the fork").
    pub fn state(&self) -> NodeState {
        match self.phase {
            ForkPhase::Unsplit | ForkPhase::Split => self.slot.state,
            ForkPhase::Chunks => aggregate_chunk_states(&self.chunks),
            ForkPhase::Join => self.join_slot.as_ref().map(|s| s.state).unwrap_or(NodeState::Waiting),
        }
    }

    /// Advance the fork by one tick. `cmd_for` builds the command line for
    /// a phase tag (`"run"`, `"split"`, `"chunk"`, `"join"`) and an
    /// optional chunk index.
    pub async fn step(
        &mut self,
        job_manager: &dyn JobManager,
        available: &mut ResourceSnapshot,
        cmd_for: &dyn Fn(&str, Option<u32>) -> JobSpec,
        metadata_for_chunk: &dyn Fn(u32) -> MetadataStore,
    ) -> Result<bool, RuntimeError> {
        match self.phase {
            ForkPhase::Unsplit => {
                let metadata = self.metadata.clone();
                self.slot.step(&metadata, job_manager, available, || cmd_for("run", None)).await
            }
            ForkPhase::Split => {
                let metadata = self.metadata.clone();
                let progressed = self
                    .slot
                    .step(&metadata, job_manager, available, || cmd_for("split", None))
                    .await?;
                if self.slot.state == NodeState::Complete {
                    self.start_chunks(metadata_for_chunk)?;
                }
                Ok(progressed)
            }
            ForkPhase::Chunks => {
                let mut progressed = false;
                for chunk in &mut self.chunks {
                    let metadata = chunk.metadata.clone();
                    let idx = chunk.index;
                    progressed |= chunk
                        .slot
                        .step(&metadata, job_manager, available, || cmd_for("chunk", Some(idx)))
                        .await?;
                }
                if aggregate_chunk_states(&self.chunks) == NodeState::Complete {
                    self.phase = ForkPhase::Join;
                    let mut join_slot = Slot::new(ResourceRequest::default());
                    join_slot.mark_ready();
                    self.join_slot = Some(join_slot);
                    progressed = true;
                }
                Ok(progressed)
            }
            ForkPhase::Join => {
                let metadata = self.metadata.clone();
                let Some(join_slot) = self.join_slot.as_mut() else {
                    return Ok(false);
                };
                join_slot.step(&metadata, job_manager, available, || cmd_for("join", None)).await
            }
        }
    }

    fn start_chunks(&mut self, metadata_for_chunk: &dyn Fn(u32) -> MetadataStore) -> Result<(), RuntimeError> {
        let defs = self
            .metadata
            .read_json::<SplitOuts>(MetadataFile::Outs)?
            .map(|o| o.chunks)
            .unwrap_or_default();
        self.chunks = defs
            .into_iter()
            .enumerate()
            .map(|(i, def)| {
                let index = i as u32;
                let metadata = metadata_for_chunk(index);
                metadata.write_json(MetadataFile::Args, &def)?;
                let mut slot = Slot::new(self.slot.resources);
                slot.mark_ready();
                Ok(ChunkState { index, metadata, slot })
            })
            .collect::<Result<Vec<_>, RuntimeError>>()?;
        self.phase = ForkPhase::Chunks;
        Ok(())
    }
}

fn aggregate_chunk_states(chunks: &[ChunkState]) -> NodeState {
    if chunks.is_empty() {
        return NodeState::Waiting;
    }
    if chunks.iter().any(|c| c.slot.state == NodeState::Failed) {
        return NodeState::Failed;
    }
    if chunks.iter().all(|c| matches!(c.slot.state, NodeState::Complete | NodeState::DisabledState)) {
        return NodeState::Complete;
    }
    NodeState::ForkWaiting
}

#[cfg(test)]
#[path = "fork_tests.rs"]
mod tests;
