// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The six semantic passes (§4.1): types, callables, stages, pipeline
//! declarations, pipeline arguments, top-level call. Each pass accumulates
//! every error it finds before returning; a pass with any errors halts the
//! sequence rather than feeding a half-checked table to the next pass.

use crate::error::CompileError;
use mro_core::{
    Ast, Callable, Expr, Interner, Literal, ParamDecl, PipelineDecl, Primitive, RefKind, Symbol,
    TypeDecl, TypeRef,
};
use std::collections::HashMap;

pub fn run_all(ast: &Ast, interner: &Interner) -> Result<(), mro_core::ErrorList<CompileError>> {
    let types = pass1_types(ast, interner)?;
    let callables = pass2_callables(ast, interner)?;
    pass3_stages(ast, interner, &types)?;
    pass4_pipeline_decls(ast, interner, &callables)?;
    pass5_pipeline_args(ast, interner, &types, &callables)?;
    pass6_top_call(ast, interner, &callables)?;
    Ok(())
}

type TypeTable<'a> = HashMap<Symbol, &'a TypeDecl>;
type CallableTable<'a> = HashMap<Symbol, &'a Callable>;

fn name(interner: &Interner, sym: Symbol) -> String {
    interner.resolve(sym).to_string()
}

fn pass1_types<'a>(
    ast: &'a Ast,
    interner: &Interner,
) -> Result<TypeTable<'a>, mro_core::ErrorList<CompileError>> {
    let mut errors = mro_core::ErrorList::new();
    let mut table: TypeTable = HashMap::new();
    for decl in &ast.types {
        if let Some(existing) = table.get(&decl.name()) {
            errors.push(decl.loc().clone(), CompileError::DuplicateType(name(interner, existing.name())));
        } else {
            table.insert(decl.name(), decl);
        }
    }
    for decl in &ast.types {
        if let TypeDecl::User(user) = decl {
            if let Some(missing) = unresolved_named(&user.target, &table) {
                errors.push(
                    user.loc.clone(),
                    CompileError::UnknownTypeTarget(name(interner, user.name), name(interner, missing)),
                );
            }
        }
    }
    errors.into_result().map(|()| table)
}

fn unresolved_named(ty: &TypeRef, table: &TypeTable) -> Option<Symbol> {
    match ty {
        TypeRef::Named(sym) if !table.contains_key(sym) => Some(*sym),
        TypeRef::Array(inner, _) => unresolved_named(inner, table),
        _ => None,
    }
}

fn pass2_callables<'a>(
    ast: &'a Ast,
    interner: &Interner,
) -> Result<CallableTable<'a>, mro_core::ErrorList<CompileError>> {
    let mut errors = mro_core::ErrorList::new();
    let mut table: CallableTable = HashMap::new();
    for callable in &ast.callables {
        if table.contains_key(&callable.id()) {
            errors.push(callable.loc().clone(), CompileError::DuplicateCallable(name(interner, callable.id())));
        } else {
            table.insert(callable.id(), callable);
        }
    }
    errors.into_result().map(|()| table)
}

fn pass3_stages(
    ast: &Ast,
    interner: &Interner,
    types: &TypeTable,
) -> Result<(), mro_core::ErrorList<CompileError>> {
    let mut errors = mro_core::ErrorList::new();
    for callable in &ast.callables {
        let Callable::Stage(stage) = callable else { continue };
        let stage_name = name(interner, stage.id);
        let mut seen = std::collections::HashSet::new();
        for p in stage.inputs.iter().chain(stage.outputs.iter()) {
            if !seen.insert(p.name) {
                errors.push(p.loc.clone(), CompileError::DuplicateParam(name(interner, p.name), stage_name.clone()));
            }
            if let Some(missing) = unresolved_named(&p.ty, types) {
                errors.push(
                    p.loc.clone(),
                    CompileError::UnknownParamType(name(interner, missing), name(interner, p.name)),
                );
            }
        }
        let output_names: std::collections::HashSet<_> = stage.outputs.iter().map(|o| o.name).collect();
        for r in &stage.retain {
            if !output_names.contains(r) {
                errors.push(
                    stage.loc.clone(),
                    CompileError::UnknownBindingParam(name(interner, *r), stage_name.clone()),
                );
            }
        }
    }
    errors.into_result()
}

fn pass4_pipeline_decls(
    ast: &Ast,
    interner: &Interner,
    callables: &CallableTable,
) -> Result<(), mro_core::ErrorList<CompileError>> {
    let mut errors = mro_core::ErrorList::new();
    for callable in &ast.callables {
        let Callable::Pipeline(pipeline) = callable else { continue };
        let mut instance_ids = std::collections::HashSet::new();
        for call in &pipeline.calls {
            if !callables.contains_key(&call.callee) {
                errors.push(call.loc.clone(), CompileError::UnknownCallee(name(interner, call.callee)));
                continue;
            }
            if !instance_ids.insert(call.instance_id) {
                errors.push(call.loc.clone(), CompileError::DuplicateInstanceId(name(interner, call.instance_id)));
            }
        }
    }
    errors.into_result()
}

/// Resolve aliases and file types down to a comparable shape: user-type
/// aliases unwrap to their target, file types compare as `path`.
fn resolve_alias(ty: &TypeRef, types: &TypeTable) -> TypeRef {
    match ty {
        TypeRef::Named(sym) => match types.get(sym) {
            Some(TypeDecl::User(u)) => resolve_alias(&u.target, types),
            Some(TypeDecl::File(_)) => TypeRef::Primitive(Primitive::Path),
            None => ty.clone(),
        },
        TypeRef::Array(inner, dims) => TypeRef::Array(Box::new(resolve_alias(inner, types)), *dims),
        TypeRef::Primitive(_) => ty.clone(),
    }
}

fn types_compatible(found: &TypeRef, expected: &TypeRef, types: &TypeTable) -> bool {
    let found = resolve_alias(found, types);
    let expected = resolve_alias(expected, types);
    if found == expected {
        return true;
    }
    // A bare string literal may satisfy a path-typed parameter; the
    // concrete syntax has no separate path-literal form.
    matches!(
        (&found, &expected),
        (TypeRef::Primitive(Primitive::Str), TypeRef::Primitive(Primitive::Path))
    )
}

fn literal_type(lit: &Literal) -> Option<TypeRef> {
    match lit {
        Literal::Int(_) => Some(TypeRef::Primitive(Primitive::Int)),
        Literal::Float(_) => Some(TypeRef::Primitive(Primitive::Float)),
        Literal::Str(_) => Some(TypeRef::Primitive(Primitive::Str)),
        Literal::Bool(_) => Some(TypeRef::Primitive(Primitive::Bool)),
        Literal::Path(_) => Some(TypeRef::Primitive(Primitive::Path)),
        Literal::Map(_) => Some(TypeRef::Primitive(Primitive::Map)),
        Literal::Null => None,
        Literal::Array(items) => items.first().and_then(literal_type).map(|t| t.array_of()),
    }
}

fn outputs_of<'a>(callable: &'a Callable) -> HashMap<Symbol, &'a ParamDecl> {
    callable.outputs().iter().map(|p| (p.name, p)).collect()
}

fn inputs_of<'a>(params: &'a [ParamDecl]) -> HashMap<Symbol, &'a ParamDecl> {
    params.iter().map(|p| (p.name, p)).collect()
}

/// Infer the declared type of an expression (ignoring any enclosing
/// [`Expr::Sweep`], which the caller handles separately).
fn infer_leaf_type(
    expr: &Expr,
    pipeline: &PipelineDecl,
    preceding: &HashMap<Symbol, &Callable>,
    interner: &Interner,
) -> Result<Option<TypeRef>, CompileError> {
    match expr {
        Expr::Literal(lit) => Ok(literal_type(lit)),
        Expr::Ref(r) => match r.kind {
            RefKind::SelfParam => {
                let inputs = inputs_of(&pipeline.inputs);
                Ok(inputs.get(&r.output_id).map(|p| p.ty.clone()))
            }
            RefKind::Call => {
                // A parser invariant, not a user-facing condition: `Ref { kind:
                // Call, .. }` is only ever constructed alongside a call id.
                let Some(call_id) = r.call_id else {
                    return Ok(None);
                };
                let producer = preceding
                    .get(&call_id)
                    .ok_or_else(|| CompileError::DanglingCallReference(name(interner, call_id)))?;
                let outputs = outputs_of(producer);
                Ok(outputs.get(&r.output_id).map(|p| p.ty.clone()))
            }
        },
        Expr::Sweep(inner) => infer_leaf_type(inner, pipeline, preceding, interner),
    }
}

fn pass5_pipeline_args(
    ast: &Ast,
    interner: &Interner,
    types: &TypeTable,
    callables: &CallableTable,
) -> Result<(), mro_core::ErrorList<CompileError>> {
    let mut errors = mro_core::ErrorList::new();
    for callable in &ast.callables {
        let Callable::Pipeline(pipeline) = callable else { continue };
        let mut preceding: HashMap<Symbol, &Callable> = HashMap::new();
        for call in &pipeline.calls {
            // Unknown callees were already reported by pass 4, which halts
            // the sequence before pass 5 runs on errorful input.
            let Some(producer) = callables.get(&call.callee).copied() else {
                continue;
            };
            let callee_inputs = inputs_of(producer.inputs());
            let mut bound = std::collections::HashSet::new();
            for binding in &call.bindings {
                bound.insert(binding.param);
                let Some(param) = callee_inputs.get(&binding.param) else {
                    errors.push(
                        binding.loc.clone(),
                        CompileError::UnknownBindingParam(name(interner, binding.param), name(interner, call.callee)),
                    );
                    continue;
                };
                match check_binding_type(&binding.expr, &param.ty, pipeline, &preceding, types, interner) {
                    Ok(true) => {}
                    Ok(false) => {
                        let found_desc = describe_expr_type(&binding.expr, pipeline, &preceding, interner)
                            .unwrap_or_else(|| "<unresolved>".to_string());
                        errors.push(
                            binding.loc.clone(),
                            CompileError::TypeMismatch {
                                expected: describe_type(&param.ty, interner),
                                found: found_desc,
                            },
                        );
                    }
                    Err(e) => errors.push(binding.loc.clone(), e),
                }
            }
            for p in producer.inputs() {
                if !bound.contains(&p.name) {
                    errors.push(call.loc.clone(), CompileError::MissingBinding(name(interner, p.name)));
                }
            }
            preceding.insert(call.instance_id, producer);
        }
        for ret in &pipeline.ret {
            let self_output = pipeline.outputs.iter().find(|o| o.name == ret.output);
            match self_output {
                None => errors.push(ret.loc.clone(), CompileError::UnknownReturnOutput(name(interner, ret.output))),
                Some(out) => match check_binding_type(&ret.expr, &out.ty, pipeline, &preceding, types, interner) {
                    Ok(true) => {}
                    Ok(false) => {
                        let found_desc = describe_expr_type(&ret.expr, pipeline, &preceding, interner)
                            .unwrap_or_else(|| "<unresolved>".to_string());
                        errors.push(
                            ret.loc.clone(),
                            CompileError::TypeMismatch { expected: describe_type(&out.ty, interner), found: found_desc },
                        );
                    }
                    Err(e) => errors.push(ret.loc.clone(), e),
                },
            }
        }
        for out in &pipeline.outputs {
            if !pipeline.ret.iter().any(|r| r.output == out.name) {
                errors.push(pipeline.loc.clone(), CompileError::MissingReturnBinding(name(interner, out.name)));
            }
        }
    }
    errors.into_result()
}

fn describe_type(ty: &TypeRef, interner: &Interner) -> String {
    match ty {
        TypeRef::Primitive(p) => p.name().to_string(),
        TypeRef::Named(sym) => interner.resolve(*sym).to_string(),
        TypeRef::Array(inner, dims) => format!("{}{}", describe_type(inner, interner), "[]".repeat(*dims as usize)),
    }
}

fn describe_expr_type(
    expr: &Expr,
    pipeline: &PipelineDecl,
    preceding: &HashMap<Symbol, &Callable>,
    interner: &Interner,
) -> Option<String> {
    // Best-effort diagnostic rendering; falls back to None on dangling refs.
    match expr {
        Expr::Sweep(inner) => infer_leaf_type(inner, pipeline, preceding, interner)
            .ok()
            .flatten()
            .map(|t| describe_type(&t, interner)),
        other => infer_leaf_type(other, pipeline, preceding, interner)
            .ok()
            .flatten()
            .map(|t| describe_type(&t, interner)),
    }
}

/// Check a binding's expression against a declared parameter type,
/// applying array lifting for sweeps (§3 invariants).
fn check_binding_type(
    expr: &Expr,
    param_ty: &TypeRef,
    pipeline: &PipelineDecl,
    preceding: &HashMap<Symbol, &Callable>,
    types: &TypeTable,
    interner: &Interner,
) -> Result<bool, CompileError> {
    if let Expr::Sweep(inner) = expr {
        let inner_ty = infer_leaf_type(inner, pipeline, preceding, interner)?;
        return Ok(match inner_ty {
            Some(t) => match t.element_type() {
                Some(elem) => types_compatible(&elem, param_ty, types),
                None => types_compatible(&t, param_ty, types),
            },
            None => true, // null / unresolved collection: accepted, matches dynamic-language leniency
        });
    }
    let found = infer_leaf_type(expr, pipeline, preceding, interner)?;
    Ok(match found {
        Some(t) => types_compatible(&t, param_ty, types),
        None => true, // null literal assignable to anything
    })
}

fn pass6_top_call(
    ast: &Ast,
    interner: &Interner,
    callables: &CallableTable,
) -> Result<(), mro_core::ErrorList<CompileError>> {
    let mut errors = mro_core::ErrorList::new();
    if let Some(top) = &ast.top_call {
        match callables.get(&top.callee) {
            None => errors.push(top.loc.clone(), CompileError::UnknownTopCallee(name(interner, top.callee))),
            Some(callee) => {
                let inputs = inputs_of(callee.inputs());
                let mut bound = std::collections::HashSet::new();
                for binding in &top.bindings {
                    bound.insert(binding.param);
                    if !inputs.contains_key(&binding.param) {
                        errors.push(
                            binding.loc.clone(),
                            CompileError::UnknownBindingParam(name(interner, binding.param), name(interner, top.callee)),
                        );
                    }
                }
                for p in callee.inputs() {
                    if !bound.contains(&p.name) {
                        errors.push(top.loc.clone(), CompileError::MissingBinding(name(interner, p.name)));
                    }
                }
            }
        }
    }
    errors.into_result()
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
