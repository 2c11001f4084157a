// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mro-core: shared AST, symbol table, and time/error primitives used by the
//! compiler, runtime, job manager, storage, daemon, and CLI crates.

pub mod ast;
pub mod ast_callable;
pub mod ast_expr;
pub mod ast_types;
pub mod clock;
pub mod errors;
pub mod id;
pub mod interner;
pub mod source_location;

pub use ast::{Ast, CompiledAst, Include};
pub use ast_callable::{
    Binding, Callable, CallStmt, Modifiers, ParamDecl, PipelineDecl, ResourceHints,
    ReturnBinding, SourceDecl, SourceLang, StageDecl, TopCall,
};
pub use ast_expr::{Expr, Literal, Ref, RefKind};
pub use ast_types::{FileTypeDecl, Primitive, TypeDecl, TypeRef, UserTypeDecl};
pub use clock::{Clock, FakeClock, SystemClock};
pub use errors::{ErrorList, Located};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use interner::{Interner, Symbol, Symbols};
pub use source_location::{IncludeLink, SourceLocation};
