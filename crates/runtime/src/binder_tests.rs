// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ForkPhase;
use mro_compiler::CompileResult;
use tempfile::tempdir;

fn compiled(src: &str) -> CompiledAst {
    match mro_compiler::compile_str(src, "test.mro") {
        CompileResult::Ok(compiled) => compiled,
        other => panic!("expected a successful compile, got {:?}", other),
    }
}

#[test]
fn binding_a_single_stage_top_call_produces_one_node_with_one_fork() {
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
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let node = graph.get(root);
    assert!(node.kind.is_stage());
    assert_eq!(node.forks.len(), 1);
    assert_eq!(node.state, NodeState::Waiting);
}

#[test]
fn binding_a_pipeline_builds_a_child_per_call() {
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
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let root_node = graph.get(root);
    assert!(root_node.kind.is_pipeline());
    assert_eq!(root_node.children.len(), 2);

    let a = *root_node.children.get("a").unwrap();
    let b = *root_node.children.get("b").unwrap();
    assert!(graph.get(b).prereqs.contains(&a));
    assert!(graph.get(a).postnodes.contains(&b));
}

#[test]
fn a_preflight_call_becomes_a_prerequisite_of_its_non_preflight_siblings() {
    let compiled = compiled(
        r#"
        stage CHECK(in int x, out bool ok)
        {
            src py "check.py"
        }
        stage WORK(in int x, out string y)
        {
            src py "work.py"
        }
        pipeline PIPE(in int x, out string y)
        {
            preflight call CHECK check(x = self.x)
            call WORK work(x = self.x)
            return (y = work.y)
        }
        call PIPE(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let root_node = graph.get(root);
    let check = *root_node.children.get("check").unwrap();
    let work = *root_node.children.get("work").unwrap();
    assert!(graph.get(work).prereqs.contains(&check));
}

#[test]
fn a_return_binding_marks_its_producer_as_retained() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        pipeline PIPE(in int x, out string y)
        {
            call STAGE_A a(x = self.x)
            return (y = a.y)
        }
        call PIPE(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let a = *graph.get(root).children.get("a").unwrap();
    assert_eq!(graph.get(a).retain, vec!["y".to_string()]);
}

#[test]
fn a_disabled_call_propagates_disabled_state_to_its_subtree() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        pipeline INNER(in int x, out string y)
        {
            call STAGE_A a(x = self.x)
            return (y = a.y)
        }
        pipeline OUTER(in int x, out string y)
        {
            disabled call INNER inner(x = self.x)
            return (y = inner.y)
        }
        call OUTER(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    let inner = *graph.get(root).children.get("inner").unwrap();
    let a = *graph.get(inner).children.get("a").unwrap();
    assert_eq!(graph.get(a).state, NodeState::DisabledState);
}

#[test]
fn a_literal_sweep_binding_produces_one_fork_per_element() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
        }
        call STAGE_A(x = sweep([1, 2, 3]))
        "#,
    );
    let dir = tempdir().unwrap();
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    assert_eq!(graph.get(root).forks.len(), 3);
}

#[test]
fn mismatched_sweep_axis_lengths_are_rejected() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, in int y, out string z)
        {
            src py "a.py"
        }
        call STAGE_A(x = sweep([1, 2, 3]), y = sweep([10, 20]))
        "#,
    );
    let dir = tempdir().unwrap();
    let err = bind(&compiled, dir.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, RuntimeError::SweepLengthMismatch(_, 3, 2)));
}

#[test]
fn a_split_stage_starts_every_fork_in_the_split_phase() {
    let compiled = compiled(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
            split
        }
        call STAGE_A(x = 3)
        "#,
    );
    let dir = tempdir().unwrap();
    let (graph, root) = bind(&compiled, dir.path().to_path_buf()).unwrap();
    assert_eq!(graph.get(root).forks[0].phase, ForkPhase::Split);
}
