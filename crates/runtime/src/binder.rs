// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a compiled AST plus a top-level call into the node tree a
//! pipestance schedules (§4.2 "Invocation binder construction").
//!
//! The binder treats the entry call exactly like any `CallStmt` inside an
//! implicit enclosing pipeline: whether the top-level callee is a stage or
//! a pipeline, the same recursive helper builds its node, so the root of
//! the returned graph can be either kind without a separate code path.

use std::collections::HashMap;
use std::path::PathBuf;

use mro_core::{
    Binding, Callable, CompiledAst, Expr, Literal, Modifiers, PipelineDecl, Primitive, Ref,
    RefKind, StageDecl, Symbol, Symbols, TypeRef,
};
use mro_storage::MetadataStore;

use crate::error::RuntimeError;
use crate::fork::Fork;
use crate::graph::{Graph, NodeId};
use crate::node::{Node, NodeKind, ResourceRequest, StagePayload};
use crate::NodeState;

type CallableTable<'a> = HashMap<Symbol, &'a Callable>;

/// Build the node tree rooted at `compiled`'s top-level call, with node
/// directories nested under `root_dir` by instance id.
pub fn bind(compiled: &CompiledAst, root_dir: PathBuf) -> Result<(Graph, NodeId), RuntimeError> {
    let ast = &compiled.ast;
    let symbols = &compiled.symbols;
    let top_call = ast.top_call.as_ref().ok_or(RuntimeError::NoTopCall)?;

    let callables: CallableTable = ast.callables.iter().map(|c| (c.id(), c)).collect();
    let callee = callables
        .get(&top_call.callee)
        .ok_or_else(|| RuntimeError::UnknownTopCallee(symbols.resolve(top_call.callee).to_string()))?;

    let mut graph = Graph::new();
    let root = bind_call(
        symbols,
        &callables,
        callee,
        symbols.resolve(top_call.callee).to_string(),
        root_dir,
        None,
        &top_call.bindings,
        Modifiers::default(),
        &mut graph,
    )?;
    Ok((graph, root))
}

#[allow(clippy::too_many_arguments)]
fn bind_call(
    symbols: &Symbols,
    callables: &CallableTable,
    callee: &Callable,
    fqname: String,
    path: PathBuf,
    parent: Option<NodeId>,
    bindings: &[Binding],
    modifiers: Modifiers,
    graph: &mut Graph,
) -> Result<NodeId, RuntimeError> {
    match callee {
        Callable::Stage(stage) => bind_stage(stage, symbols, fqname, path, parent, bindings, modifiers, graph),
        Callable::Pipeline(pipeline) => {
            bind_pipeline(symbols, callables, pipeline, fqname, path, parent, modifiers, graph)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn bind_stage(
    stage: &StageDecl,
    symbols: &Symbols,
    fqname: String,
    path: PathBuf,
    parent: Option<NodeId>,
    bindings: &[Binding],
    modifiers: Modifiers,
    graph: &mut Graph,
) -> Result<NodeId, RuntimeError> {
    let resources = ResourceRequest {
        threads: stage.resources.as_ref().and_then(|r| r.threads).unwrap_or(1),
        mem_gb: stage.resources.as_ref().and_then(|r| r.mem_gb).unwrap_or(1),
    };
    let file_outputs: Vec<String> = stage
        .outputs
        .iter()
        .filter(|p| is_file_typed(&p.ty))
        .map(|p| symbols.resolve(p.name).to_string())
        .collect();
    let retain: Vec<String> = stage.retain.iter().map(|s| symbols.resolve(*s).to_string()).collect();
    let forks = sweep_forks(bindings, stage.split, &path, resources, file_outputs, &fqname)?;

    Ok(graph.insert(|id| Node {
        id,
        fqname,
        path: path.clone(),
        parent,
        children: Default::default(),
        prereqs: Vec::new(),
        postnodes: Vec::new(),
        state: if modifiers.disabled { NodeState::DisabledState } else { NodeState::Waiting },
        forks,
        retain,
        resources,
        modifiers,
        kind: NodeKind::Stage(StagePayload {
            src: stage.src.clone(),
            split: stage.split,
            strict_volatile: stage.resources.as_ref().map(|r| r.strict_volatile).unwrap_or(false),
        }),
        metadata: MetadataStore::new(&path),
    }))
}

/// One fork per element of the zipped sweep axes found among `bindings`
/// (§4.4). Axes whose extent can't be known until a producer runs (any
/// sweep over a call reference rather than a literal array) fall back to a
/// single, unexpanded fork; the scheduler re-derives real fork counts for
/// `split` stages from the split job's own output once it completes.
fn sweep_forks(
    bindings: &[Binding],
    split: bool,
    stage_path: &std::path::Path,
    resources: ResourceRequest,
    file_outputs: Vec<String>,
    call_name: &str,
) -> Result<Vec<Fork>, RuntimeError> {
    let mut literal_axes: Vec<&[Literal]> = Vec::new();
    for binding in bindings {
        if let Expr::Sweep(inner) = &binding.expr {
            if let Expr::Literal(Literal::Array(items)) = inner.as_ref() {
                literal_axes.push(items);
            }
        }
    }
    if let Some(first_axis) = literal_axes.first() {
        let first_len = first_axis.len();
        if let Some(mismatched) = literal_axes.iter().map(|a| a.len()).find(|len| *len != first_len) {
            return Err(RuntimeError::SweepLengthMismatch(call_name.to_string(), first_len, mismatched));
        }
    }
    let count = literal_axes.first().map(|a| a.len()).unwrap_or(1).max(1);
    Ok((0..count as u32)
        .map(|i| {
            let sweep_values: Vec<Literal> = literal_axes.iter().filter_map(|a| a.get(i as usize).cloned()).collect();
            let fork_dir = if count == 1 { stage_path.to_path_buf() } else { stage_path.join(format!("fork{}", i)) };
            Fork::new(i, sweep_values, MetadataStore::new(fork_dir), split, resources, file_outputs.clone())
        })
        .collect())
}

#[allow(clippy::too_many_arguments)]
fn bind_pipeline(
    symbols: &Symbols,
    callables: &CallableTable,
    pipeline: &PipelineDecl,
    fqname: String,
    path: PathBuf,
    parent: Option<NodeId>,
    modifiers: Modifiers,
    graph: &mut Graph,
) -> Result<NodeId, RuntimeError> {
    let node_id = graph.insert(|id| Node {
        id,
        fqname: fqname.clone(),
        path: path.clone(),
        parent,
        children: Default::default(),
        prereqs: Vec::new(),
        postnodes: Vec::new(),
        state: if modifiers.disabled { NodeState::DisabledState } else { NodeState::Waiting },
        forks: Vec::new(),
        retain: Vec::new(),
        resources: ResourceRequest::default(),
        modifiers,
        kind: NodeKind::Pipeline,
        metadata: MetadataStore::new(&path),
    });

    let mut bound: HashMap<Symbol, NodeId> = HashMap::new();
    let mut preflights = Vec::new();
    let mut non_preflights = Vec::new();

    for call in &pipeline.calls {
        let instance_name = symbols.resolve(call.instance_id).to_string();
        if bound.contains_key(&call.instance_id) {
            return Err(RuntimeError::DuplicateInstanceId(instance_name, fqname.clone()));
        }
        let callee = callables.get(&call.callee).ok_or_else(|| {
            RuntimeError::UnresolvedCallReference(symbols.resolve(call.callee).to_string(), instance_name.clone())
        })?;
        let child_modifiers = if modifiers.disabled {
            Modifiers { disabled: true, ..call.modifiers }
        } else {
            call.modifiers
        };
        let child_id = bind_call(
            symbols,
            callables,
            callee,
            format!("{}.{}", fqname, instance_name),
            path.join(&instance_name),
            Some(node_id),
            &call.bindings,
            child_modifiers,
            graph,
        )?;
        graph.get_mut(node_id).children.insert(instance_name, child_id);

        for binding in &call.bindings {
            link_reference(&binding.expr, &bound, child_id, graph);
        }
        bound.insert(call.instance_id, child_id);

        if call.modifiers.preflight {
            preflights.push(child_id);
        } else {
            non_preflights.push(child_id);
        }
    }

    for &preflight_id in &preflights {
        for &sibling_id in &non_preflights {
            if !graph.get(sibling_id).prereqs.contains(&preflight_id) {
                graph.get_mut(sibling_id).prereqs.push(preflight_id);
            }
            graph.get_mut(preflight_id).postnodes.push(sibling_id);
        }
    }

    for ret in &pipeline.ret {
        link_retain(&ret.expr, symbols, &bound, graph);
        link_reference(&ret.expr, &bound, node_id, graph);
    }
    for retain_expr in &pipeline.retain {
        link_retain(retain_expr, symbols, &bound, graph);
    }

    Ok(node_id)
}

/// Record that `consumer` depends on whatever call a binding expression
/// references (the reverse of the producer → consumer data flow), per the
/// weak-reference design note: these are index lookups, not owned edges.
fn link_reference(expr: &Expr, bound: &HashMap<Symbol, NodeId>, consumer: NodeId, graph: &mut Graph) {
    match expr {
        Expr::Ref(Ref { kind: RefKind::Call, call_id: Some(call_id), .. }) => {
            if let Some(&producer) = bound.get(call_id) {
                if producer != consumer && !graph.get(consumer).prereqs.contains(&producer) {
                    graph.get_mut(consumer).prereqs.push(producer);
                }
                if producer != consumer {
                    graph.get_mut(producer).postnodes.push(consumer);
                }
            }
        }
        Expr::Sweep(inner) => link_reference(inner, bound, consumer, graph),
        _ => {}
    }
}

/// Mark a `return`- or pipeline-level `retain(...)` reference's immediate
/// producer as non-deletable. Retention through further nested pipeline
/// levels is re-derived the same way at each level as the binder recurses,
/// so a value threaded through several `return` statements ends up marked
/// at its original stage producer by induction.
fn link_retain(expr: &Expr, symbols: &Symbols, bound: &HashMap<Symbol, NodeId>, graph: &mut Graph) {
    match expr {
        Expr::Ref(Ref { kind: RefKind::Call, call_id: Some(call_id), output_id }) => {
            if let Some(&producer) = bound.get(call_id) {
                let name = symbols.resolve(*output_id).to_string();
                let node = graph.get_mut(producer);
                if !node.retain.contains(&name) {
                    node.retain.push(name);
                }
            }
        }
        Expr::Sweep(inner) => link_retain(inner, symbols, bound, graph),
        _ => {}
    }
}

fn is_file_typed(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Primitive(Primitive::Path) => true,
        TypeRef::Array(inner, _) => is_file_typed(inner),
        _ => false,
    }
}

#[cfg(test)]
#[path = "binder_tests.rs"]
mod tests;
