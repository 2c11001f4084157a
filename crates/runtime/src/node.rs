// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime's unit of execution: a tagged-variant node shared by stages
//! and pipelines (§3 "Runtime entities" / Node, §9 design note on
//! polymorphism).

use std::path::PathBuf;

use indexmap::IndexMap;
use mro_core::{Modifiers, SourceDecl};
use mro_storage::MetadataStore;

use crate::fork::Fork;
use crate::graph::NodeId;
use crate::NodeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceRequest {
    pub threads: u32,
    pub mem_gb: u32,
}

/// Stage-specific payload; everything else on `Node` is shared with
/// pipeline nodes.
#[derive(Debug, Clone)]
pub struct StagePayload {
    pub src: SourceDecl,
    pub split: bool,
    /// Protects every output of every fork of this stage from volatile
    /// deletion, applied uniformly across the stage rather than per fork
    /// (§4.4 resources clause).
    pub strict_volatile: bool,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Stage(StagePayload),
    Pipeline,
}

impl NodeKind {
    pub fn is_stage(&self) -> bool {
        matches!(self, NodeKind::Stage(_))
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self, NodeKind::Pipeline)
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub fqname: String,
    pub path: PathBuf,
    pub parent: Option<NodeId>,
    pub children: IndexMap<String, NodeId>,
    /// Weak back-references: lookups into the arena, never ownership
    /// (§9 design note).
    pub prereqs: Vec<NodeId>,
    pub postnodes: Vec<NodeId>,
    pub state: NodeState,
    pub forks: Vec<Fork>,
    pub retain: Vec<String>,
    pub resources: ResourceRequest,
    pub modifiers: Modifiers,
    pub kind: NodeKind,
    pub metadata: MetadataStore,
}

impl Node {
    pub fn is_leaf_frontier(&self) -> bool {
        self.kind.is_stage()
    }

    /// Every prerequisite has reached a state that releases this node to
    /// run (§4.3: "Waiting → Ready: all prerequisite nodes are Complete
    /// (or DisabledState)").
    pub fn prereqs_satisfied(&self, graph: &crate::graph::Graph) -> bool {
        self.prereqs
            .iter()
            .all(|id| matches!(graph.get(*id).state, NodeState::Complete | NodeState::DisabledState))
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
