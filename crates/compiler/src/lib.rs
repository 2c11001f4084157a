// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Parsing, include resolution, and the six-pass semantic compiler for the
//! pipeline language, plus the canonical formatter.

mod error;
mod format;
mod include;
mod lexer;
mod parser;
mod passes;

pub use error::CompileError;
pub use format::format_source;
pub use include::{IncludeError, Includer};
pub use parser::{parse_file, ParseError};

use mro_core::{Ast, CompiledAst, ErrorList, Interner};
use std::path::Path;

/// Compile a root source file: resolve includes, run all six semantic
/// passes, and return the fully resolved AST with its symbol table.
#[tracing::instrument(skip(search_paths), fields(root = %root.display()))]
pub fn compile_file(root: &Path, search_paths: &[std::path::PathBuf]) -> CompileResult {
    let mut interner = Interner::new();
    let includer = Includer::new(search_paths.to_vec());
    let ast = match includer.resolve(root, &mut interner) {
        Ok(ast) => ast,
        Err(e) => {
            tracing::warn!(error = %e, "include resolution failed");
            return CompileResult::IncludeError(e);
        }
    };
    match passes::run_all(&ast, &interner) {
        Ok(()) => CompileResult::Ok(CompiledAst {
            ast,
            symbols: interner.freeze(),
        }),
        Err(errors) => {
            tracing::warn!(count = errors.len(), "compilation failed");
            CompileResult::CompileErrors(errors)
        }
    }
}

/// Compile already-merged source text with no include resolution, for tests
/// and for the single-file fast path.
pub fn compile_str(source: &str, file_name: &str) -> CompileResult {
    let mut interner = Interner::new();
    let ast = match parser::parse_file(source, file_name, std::path::Path::new(file_name), &mut interner) {
        Ok(ast) => ast,
        Err(e) => return CompileResult::ParseError(e),
    };
    match passes::run_all(&ast, &interner) {
        Ok(()) => CompileResult::Ok(CompiledAst {
            ast,
            symbols: interner.freeze(),
        }),
        Err(errors) => CompileResult::CompileErrors(errors),
    }
}

#[derive(Debug)]
pub enum CompileResult {
    Ok(CompiledAst),
    ParseError(ParseError),
    IncludeError(IncludeError),
    CompileErrors(ErrorList<CompileError>),
}

impl CompileResult {
    pub fn into_ast(self) -> Result<CompiledAst, String> {
        match self {
            CompileResult::Ok(ast) => Ok(ast),
            CompileResult::ParseError(e) => Err(e.to_string()),
            CompileResult::IncludeError(e) => Err(e.to_string()),
            CompileResult::CompileErrors(errors) => Err(errors.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "properties_tests.rs"]
mod properties_tests;
