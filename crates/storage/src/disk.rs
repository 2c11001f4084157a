// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-space check for the pipestance directory watchdog.

use std::io;
use std::path::Path;

pub fn free_space_bytes(path: &Path) -> io::Result<u64> {
    fs2::free_space(path)
}

#[cfg(test)]
#[path = "disk_tests.rs"]
mod tests;
