// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical formatter: the compiler is also the formatter (§4.1
//! "Returned artifacts"). Rendering is driven purely off the resolved AST,
//! so `compile -> format -> compile -> format` is idempotent by
//! construction (§8 property 2).

use mro_core::{Callable, CompiledAst, Expr, Literal, ParamDecl, Ref, RefKind, TypeRef};

pub fn format_source(compiled: &CompiledAst) -> String {
    let symbols = &compiled.symbols;
    let mut out = String::new();
    for include in &compiled.ast.includes {
        out.push_str(&format!("@include \"{}\"\n", include.name));
    }
    if !compiled.ast.includes.is_empty() {
        out.push('\n');
    }
    for callable in &compiled.ast.callables {
        match callable {
            Callable::Stage(stage) => {
                out.push_str(&format_stage(stage, symbols));
            }
            Callable::Pipeline(pipeline) => {
                out.push_str(&format_pipeline(pipeline, symbols));
            }
        }
        out.push('\n');
    }
    if let Some(top) = &compiled.ast.top_call {
        out.push_str(&format!(
            "call {}({})\n",
            symbols.resolve(top.callee),
            format_binding_list(&top.bindings, symbols)
        ));
    }
    out
}

fn format_type(ty: &TypeRef, symbols: &mro_core::Symbols) -> String {
    match ty {
        TypeRef::Primitive(p) => p.name().to_string(),
        TypeRef::Named(sym) => symbols.resolve(*sym).to_string(),
        TypeRef::Array(inner, dims) => {
            format!("{}{}", format_type(inner, symbols), "[]".repeat(*dims as usize))
        }
    }
}

fn format_param(param: &ParamDecl, dir: &str, symbols: &mro_core::Symbols) -> String {
    format!("{} {} {}", dir, format_type(&param.ty, symbols), symbols.resolve(param.name))
}

fn format_params(inputs: &[ParamDecl], outputs: &[ParamDecl], symbols: &mro_core::Symbols) -> String {
    let mut parts: Vec<String> = inputs.iter().map(|p| format_param(p, "in", symbols)).collect();
    parts.extend(outputs.iter().map(|p| format_param(p, "out", symbols)));
    parts.join(", ")
}

fn format_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::Str(s) => format!("\"{}\"", s),
        Literal::Bool(v) => v.to_string(),
        Literal::Path(s) => format!("\"{}\"", s),
        Literal::Null => "null".to_string(),
        Literal::Array(items) => {
            format!("[{}]", items.iter().map(format_literal).collect::<Vec<_>>().join(", "))
        }
        Literal::Map(entries) => {
            let body = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_literal(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", body)
        }
    }
}

fn format_ref(r: &Ref, symbols: &mro_core::Symbols) -> String {
    match r.kind {
        RefKind::SelfParam => format!("self.{}", symbols.resolve(r.output_id)),
        RefKind::Call => format!(
            "{}.{}",
            r.call_id.map(|id| symbols.resolve(id)).unwrap_or("?"),
            symbols.resolve(r.output_id)
        ),
    }
}

fn format_expr(expr: &Expr, symbols: &mro_core::Symbols) -> String {
    match expr {
        Expr::Literal(lit) => format_literal(lit),
        Expr::Ref(r) => format_ref(r, symbols),
        Expr::Sweep(inner) => format!("sweep({})", format_expr(inner, symbols)),
    }
}

fn format_binding_list(bindings: &[mro_core::Binding], symbols: &mro_core::Symbols) -> String {
    bindings
        .iter()
        .map(|b| format!("{} = {}", symbols.resolve(b.param), format_expr(&b.expr, symbols)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_stage(stage: &mro_core::StageDecl, symbols: &mro_core::Symbols) -> String {
    let mut body = String::new();
    let lang = match stage.src.lang {
        mro_core::SourceLang::Python => "py",
        mro_core::SourceLang::Executable => "exec",
        mro_core::SourceLang::Compiled => "comp",
    };
    body.push_str(&format!("    src {} \"{}\"", lang, stage.src.path));
    for arg in &stage.src.args {
        body.push_str(&format!(", \"{}\"", arg));
    }
    body.push('\n');
    if stage.split {
        body.push_str("    split\n");
    }
    if !stage.retain.is_empty() {
        let names: Vec<_> = stage.retain.iter().map(|s| symbols.resolve(*s)).collect();
        body.push_str(&format!("    retain({})\n", names.join(", ")));
    }
    if let Some(r) = &stage.resources {
        let mut parts = Vec::new();
        if let Some(t) = r.threads {
            parts.push(format!("threads = {}", t));
        }
        if let Some(m) = r.mem_gb {
            parts.push(format!("mem_gb = {}", m));
        }
        if let Some(s) = &r.special {
            parts.push(format!("special = \"{}\"", s));
        }
        if r.strict_volatile {
            parts.push("strict_volatile = true".to_string());
        }
        body.push_str(&format!("    resources {{ {} }}\n", parts.join(", ")));
    }
    format!(
        "stage {}({})\n{{\n{}}}\n",
        symbols.resolve(stage.id),
        format_params(&stage.inputs, &stage.outputs, symbols),
        body
    )
}

fn format_pipeline(pipeline: &mro_core::PipelineDecl, symbols: &mro_core::Symbols) -> String {
    let mut body = String::new();
    for call in &pipeline.calls {
        let mut modifiers = Vec::new();
        if call.modifiers.preflight {
            modifiers.push("preflight");
        }
        if call.modifiers.volatile {
            modifiers.push("volatile");
        }
        if call.modifiers.local {
            modifiers.push("local");
        }
        if call.modifiers.disabled {
            modifiers.push("disabled");
        }
        let prefix = if modifiers.is_empty() {
            String::new()
        } else {
            format!("{} ", modifiers.join(" "))
        };
        body.push_str(&format!(
            "    {}call {} {}({})\n",
            prefix,
            symbols.resolve(call.callee),
            symbols.resolve(call.instance_id),
            format_binding_list(&call.bindings, symbols)
        ));
    }
    if !pipeline.ret.is_empty() {
        let rendered = pipeline
            .ret
            .iter()
            .map(|r| format!("{} = {}", symbols.resolve(r.output), format_expr(&r.expr, symbols)))
            .collect::<Vec<_>>()
            .join(", ");
        body.push_str(&format!("    return ({})\n", rendered));
    }
    if !pipeline.retain.is_empty() {
        let rendered = pipeline
            .retain
            .iter()
            .map(|e| format_expr(e, symbols))
            .collect::<Vec<_>>()
            .join(", ");
        body.push_str(&format!("    retain({})\n", rendered));
    }
    format!(
        "pipeline {}({})\n{{\n{}}}\n",
        symbols.resolve(pipeline.id),
        format_params(&pipeline.inputs, &pipeline.outputs, symbols),
        body
    )
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
