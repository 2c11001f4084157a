// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source locations: file name, absolute path, line, and the chain of
//! includes that pulled the file in (§3 "Source locations").

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One link in an include chain: the including file and the line of the
/// `@include` directive that pulled in the next file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IncludeLink {
    pub file: String,
    pub line: u32,
}

/// A location within a source file, carrying enough context to reconstruct
/// the include chain that led to it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    /// File name as written in source (e.g. `stages.mro`).
    pub file: String,
    /// Absolute path on disk.
    pub abs_path: Arc<PathBuf>,
    pub line: u32,
    /// Non-empty when this location is reached through one or more
    /// `@include` directives, outermost file first.
    pub include_chain: Vec<IncludeLink>,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, abs_path: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            abs_path: Arc::new(abs_path.into()),
            line,
            include_chain: Vec::new(),
        }
    }

    /// Build a location reached via `includer` (whose own chain is
    /// extended by one link).
    pub fn included_from(mut self, includer: &SourceLocation, include_line: u32) -> Self {
        let mut chain = includer.include_chain.clone();
        chain.push(IncludeLink {
            file: includer.file.clone(),
            line: include_line,
        });
        self.include_chain = chain;
        self
    }

    pub fn abs_path(&self) -> &Path {
        &self.abs_path
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        for link in self.include_chain.iter().rev() {
            write!(f, " (included from {}:{})", link.file, link.line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "source_location_tests.rs"]
mod tests;
