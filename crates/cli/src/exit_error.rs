// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A typed process exit code, attached as `anyhow::Error` context and
//! downcast back out of it by `main`'s top-level error handler.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}", self.code)
    }
}

impl std::error::Error for ExitError {}
