// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callables: stages and pipelines (§3 "AST entities" / Callable, §6
//! "Source language at the boundary").

use crate::ast_expr::Expr;
use crate::ast_types::TypeRef;
use crate::interner::Symbol;
use crate::source_location::SourceLocation;

/// One declared input or output parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Symbol,
    pub ty: TypeRef,
    pub loc: SourceLocation,
}

/// The language tag of a stage's external code (§3 "source descriptor").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLang {
    Python,
    Executable,
    Compiled,
}

impl SourceLang {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "py" | "python" => Some(SourceLang::Python),
            "exec" | "executable" => Some(SourceLang::Executable),
            "comp" | "compiled" => Some(SourceLang::Compiled),
            _ => None,
        }
    }
}

/// `src lang "path" [, args…]`.
#[derive(Debug, Clone)]
pub struct SourceDecl {
    pub lang: SourceLang,
    pub path: String,
    pub args: Vec<String>,
}

/// `resources { threads, mem_gb, special, strict_volatile }`.
#[derive(Debug, Clone, Default)]
pub struct ResourceHints {
    pub threads: Option<u32>,
    pub mem_gb: Option<u32>,
    pub special: Option<String>,
    pub strict_volatile: bool,
}

/// A `stage` declaration.
#[derive(Debug, Clone)]
pub struct StageDecl {
    pub id: Symbol,
    pub inputs: Vec<ParamDecl>,
    pub outputs: Vec<ParamDecl>,
    pub src: SourceDecl,
    pub resources: Option<ResourceHints>,
    /// Output names that must survive volatile deletion (§4.4).
    pub retain: Vec<Symbol>,
    pub split: bool,
    pub loc: SourceLocation,
}

/// Call modifiers: `volatile`, `local`, `preflight`, `disabled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub volatile: bool,
    pub local: bool,
    pub preflight: bool,
    pub disabled: bool,
}

/// One binding from a parameter name to an expression.
#[derive(Debug, Clone)]
pub struct Binding {
    pub param: Symbol,
    pub expr: Expr,
    pub loc: SourceLocation,
}

/// `call <callee>(…)` inside a pipeline body.
#[derive(Debug, Clone)]
pub struct CallStmt {
    pub callee: Symbol,
    /// Unique within the enclosing pipeline.
    pub instance_id: Symbol,
    pub modifiers: Modifiers,
    pub bindings: Vec<Binding>,
    pub loc: SourceLocation,
}

/// `return (…)` binding one pipeline output to an expression.
#[derive(Debug, Clone)]
pub struct ReturnBinding {
    pub output: Symbol,
    pub expr: Expr,
    pub loc: SourceLocation,
}

/// A `pipeline` declaration.
#[derive(Debug, Clone)]
pub struct PipelineDecl {
    pub id: Symbol,
    pub inputs: Vec<ParamDecl>,
    pub outputs: Vec<ParamDecl>,
    pub calls: Vec<CallStmt>,
    pub ret: Vec<ReturnBinding>,
    /// References to preserve from volatile deletion.
    pub retain: Vec<Expr>,
    pub loc: SourceLocation,
}

/// Either declaration form admitted by the callable table.
#[derive(Debug, Clone)]
pub enum Callable {
    Stage(StageDecl),
    Pipeline(PipelineDecl),
}

impl Callable {
    pub fn id(&self) -> Symbol {
        match self {
            Callable::Stage(s) => s.id,
            Callable::Pipeline(p) => p.id,
        }
    }

    pub fn inputs(&self) -> &[ParamDecl] {
        match self {
            Callable::Stage(s) => &s.inputs,
            Callable::Pipeline(p) => &p.inputs,
        }
    }

    pub fn outputs(&self) -> &[ParamDecl] {
        match self {
            Callable::Stage(s) => &s.outputs,
            Callable::Pipeline(p) => &p.outputs,
        }
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Callable::Stage(s) => &s.loc,
            Callable::Pipeline(p) => &p.loc,
        }
    }

    pub fn as_pipeline(&self) -> Option<&PipelineDecl> {
        match self {
            Callable::Pipeline(p) => Some(p),
            Callable::Stage(_) => None,
        }
    }

    pub fn as_stage(&self) -> Option<&StageDecl> {
        match self {
            Callable::Stage(s) => Some(s),
            Callable::Pipeline(_) => None,
        }
    }
}

/// The single entry `call` at the bottom of a `.mro` file.
#[derive(Debug, Clone)]
pub struct TopCall {
    pub callee: Symbol,
    pub bindings: Vec<Binding>,
    pub loc: SourceLocation,
}
