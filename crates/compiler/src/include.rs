// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Include resolution: a preprocessing pass performed ahead of the six
//! semantic passes. Includes are resolved relative to the including file's
//! directory and a configured ordered list of search paths (§4.1 "Include
//! resolution").

use crate::parser::{parse_file, ParseError};
use mro_core::{Ast, Interner, SourceLocation};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IncludeError {
    #[error("{0}: cannot locate include '{1}'")]
    NotFound(SourceLocation, String),

    #[error("{0}: include cycle at '{1}'")]
    Cycle(SourceLocation, String),

    #[error("{0}: duplicate include of '{1}'")]
    Duplicate(SourceLocation, String),

    #[error("{0}: {1}")]
    Parse(SourceLocation, ParseError),
}

pub struct Includer {
    search_paths: Vec<PathBuf>,
}

impl Includer {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    fn locate(&self, name: &str, including_dir: &Path) -> Option<PathBuf> {
        let local = including_dir.join(name);
        if local.is_file() {
            return Some(local);
        }
        for sp in &self.search_paths {
            let candidate = sp.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Parse `root` and recursively resolve its includes, merging every
    /// descendant's AST into the root's, in encounter order.
    pub fn resolve(&self, root: &Path, interner: &mut Interner) -> Result<Ast, IncludeError> {
        let mut visiting = HashSet::new();
        let mut seen = HashSet::new();
        self.resolve_inner(root, interner, &mut visiting, &mut seen)
    }

    fn resolve_inner(
        &self,
        path: &Path,
        interner: &mut Interner,
        visiting: &mut HashSet<PathBuf>,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<Ast, IncludeError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let source = std::fs::read_to_string(path).map_err(|_| {
            IncludeError::NotFound(
                SourceLocation::new(file_name.clone(), canonical.clone(), 0),
                file_name.clone(),
            )
        })?;

        visiting.insert(canonical.clone());
        let mut ast = parse_file(&source, &file_name, &canonical, interner)
            .map_err(|e| IncludeError::Parse(SourceLocation::new(file_name.clone(), canonical.clone(), e.line), e))?;

        let including_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let includes = std::mem::take(&mut ast.includes);

        // Included declarations precede the including file's own (§3 "AST
        // entities" / Include merge order), so fold each child into a
        // fresh accumulator and merge the root's own declarations last.
        let mut merged = Ast::new();
        for include in &includes {
            let target = self
                .locate(&include.name, &including_dir)
                .ok_or_else(|| IncludeError::NotFound(include.loc.clone(), include.name.clone()))?;
            let target_canonical = target.canonicalize().unwrap_or(target.clone());

            if visiting.contains(&target_canonical) {
                return Err(IncludeError::Cycle(include.loc.clone(), include.name.clone()));
            }
            if seen.contains(&target_canonical) {
                return Err(IncludeError::Duplicate(include.loc.clone(), include.name.clone()));
            }
            seen.insert(target_canonical.clone());

            let child = self.resolve_inner(&target, interner, visiting, seen)?;
            merged.merge(child);
        }
        merged.merge(ast);
        merged.includes = includes;
        visiting.remove(&canonical);
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "include_tests.rs"]
mod tests;
