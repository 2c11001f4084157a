// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Volatile-retention policy (§4.4): a fork's file-typed outputs not
//! named in the owning node's retain list become deletion candidates
//! once every downstream consumer node has finished successfully.
//!
//! `strict_volatile` (a stage's `resources` clause) is tracked per
//! stage rather than per fork: a swept stage either protects all of its
//! forks' outputs from deletion or none of them, mirroring how `retain`
//! already applies uniformly across a stage's forks.

use crate::graph::{Graph, NodeId};
use crate::node::NodeKind;
use crate::NodeState;

/// One fork output eligible for deletion right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolatileCandidate {
    pub node: NodeId,
    pub fork_index: u32,
    pub output: String,
}

/// Scan every stage node's forks for file outputs that are neither
/// retained nor still awaited by a downstream consumer.
pub fn volatile_candidates(graph: &Graph) -> Vec<VolatileCandidate> {
    let mut out = Vec::new();
    for node in graph.iter() {
        if let NodeKind::Stage(stage) = &node.kind {
            if stage.strict_volatile {
                continue;
            }
        }
        let consumers_done = node
            .postnodes
            .iter()
            .all(|id| matches!(graph.get(*id).state, NodeState::Complete | NodeState::DisabledState));
        if !consumers_done {
            continue;
        }
        for fork in &node.forks {
            if fork.state() != NodeState::Complete {
                continue;
            }
            for output in &fork.file_outputs {
                if node.retain.contains(output) {
                    continue;
                }
                out.push(VolatileCandidate {
                    node: node.id,
                    fork_index: fork.index,
                    output: output.clone(),
                });
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "volatile_tests.rs"]
mod tests;
