// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rooted collection of top-level declarations that make up a parsed
//! (but not yet compiled) source tree (§3 "AST entities" / Include, and
//! §2 "AST").

use crate::ast_callable::{Callable, TopCall};
use crate::ast_types::TypeDecl;
use crate::interner::Symbols;
use crate::source_location::SourceLocation;

/// An `@include "name.mro"` directive.
#[derive(Debug, Clone)]
pub struct Include {
    pub name: String,
    pub loc: SourceLocation,
}

/// The merged AST produced by parsing a root file and recursively resolving
/// its includes (§4.1 "Include resolution"). Declaration order from each
/// file is preserved, includes first in file order, root file's own
/// declarations following.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub includes: Vec<Include>,
    pub types: Vec<TypeDecl>,
    pub callables: Vec<Callable>,
    /// The trailing `call …` statement, if the file declares one.
    pub top_call: Option<TopCall>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another file's already-include-resolved AST into this one, in
    /// the order `other` was encountered (used by the include resolver to
    /// fold a child file's declarations into its parent).
    pub fn merge(&mut self, other: Ast) {
        self.types.extend(other.types);
        self.callables.extend(other.callables);
        if self.top_call.is_none() {
            self.top_call = other.top_call;
        }
    }
}

/// A parsed AST paired with the symbol table it was interned against.
/// Returned by the compiler once all passes succeed (§4.1 "Returned
/// artifacts").
#[derive(Debug, Clone)]
pub struct CompiledAst {
    pub ast: Ast,
    pub symbols: Symbols,
}
