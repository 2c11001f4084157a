// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mro_core::{Interner, TypeRef};
use std::path::Path;

fn parse(src: &str) -> (Ast, Interner) {
    let mut interner = Interner::new();
    let ast = parse_file(src, "test.mro", Path::new("/tmp/test.mro"), &mut interner).unwrap();
    (ast, interner)
}

#[test]
fn parses_a_stage_declaration() {
    let (ast, interner) = parse(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "stage_a.py"
        }
        "#,
    );
    assert_eq!(ast.callables.len(), 1);
    let Callable::Stage(stage) = &ast.callables[0] else {
        panic!("expected stage");
    };
    assert_eq!(interner.resolve(stage.id), "STAGE_A");
    assert_eq!(stage.inputs.len(), 1);
    assert_eq!(stage.outputs.len(), 1);
    assert_eq!(stage.inputs[0].ty, TypeRef::Primitive(Primitive::Int));
}

#[test]
fn parses_a_pipeline_with_one_call_and_return() {
    let (ast, interner) = parse(
        r#"
        pipeline PIPE(in int x, out string y)
        {
            call STAGE_A a(x = self.x)
            return (y = a.y)
        }
        "#,
    );
    let Callable::Pipeline(pipeline) = &ast.callables[0] else {
        panic!("expected pipeline");
    };
    assert_eq!(interner.resolve(pipeline.id), "PIPE");
    assert_eq!(pipeline.calls.len(), 1);
    assert_eq!(pipeline.ret.len(), 1);
}

#[test]
fn parses_include_directive() {
    let (ast, _) = parse(r#"@include "types.mro""#);
    assert_eq!(ast.includes.len(), 1);
    assert_eq!(ast.includes[0].name, "types.mro");
}

#[test]
fn parses_top_level_call() {
    let (ast, interner) = parse(r#"call PIPE(x = 3)"#);
    let top = ast.top_call.unwrap();
    assert_eq!(interner.resolve(top.callee), "PIPE");
    assert_eq!(top.bindings.len(), 1);
}

#[test]
fn parses_array_type_with_two_dimensions() {
    let (ast, _) = parse(
        r#"
        stage STAGE_A(in int[][] xs, out string y)
        {
            src py "a.py"
        }
        "#,
    );
    let Callable::Stage(stage) = &ast.callables[0] else {
        panic!("expected stage");
    };
    assert_eq!(
        stage.inputs[0].ty,
        TypeRef::Array(Box::new(TypeRef::Array(Box::new(TypeRef::Primitive(Primitive::Int)), 1)), 2)
    );
}

#[test]
fn parses_call_modifiers_and_resources() {
    let (ast, _) = parse(
        r#"
        stage STAGE_A(in int x, out string y)
        {
            src py "a.py"
            split
            retain(y)
            resources { threads = 4, mem_gb = 8, strict_volatile = true }
        }
        pipeline PIPE(in int x, out string y)
        {
            preflight call STAGE_A check(x = self.x)
            call STAGE_A a(x = self.x)
            return (y = a.y)
        }
        "#,
    );
    let Callable::Stage(stage) = &ast.callables[0] else {
        panic!("expected stage");
    };
    assert!(stage.split);
    assert_eq!(stage.retain.len(), 1);
    let hints = stage.resources.as_ref().unwrap();
    assert_eq!(hints.threads, Some(4));
    assert!(hints.strict_volatile);

    let Callable::Pipeline(pipeline) = &ast.callables[1] else {
        panic!("expected pipeline");
    };
    assert!(pipeline.calls[0].modifiers.preflight);
    assert!(!pipeline.calls[1].modifiers.preflight);
}

#[test]
fn rejects_malformed_source() {
    let mut interner = Interner::new();
    let err = parse_file("stage (", "bad.mro", Path::new("/tmp/bad.mro"), &mut interner)
        .unwrap_err();
    assert_eq!(err.file, "bad.mro");
}
