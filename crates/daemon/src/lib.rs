// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Single-pipestance daemon: compiles a source file, creates or reattaches
//! the pipestance it names, and drives it to a terminal state under a
//! `tokio::select!` loop (`mrp`'s `main.rs`).

pub mod hook;
pub mod lifecycle;
pub mod logging;
