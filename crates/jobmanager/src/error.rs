// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobManagerError {
    #[error("I/O error launching job: {0}")]
    Io(#[from] std::io::Error),
    #[error("submit command exited with status {0}")]
    SubmitFailed(i32),
    #[error("could not parse submit command output: {0}")]
    BadSubmitOutput(String),
    #[error("could not read job queue: {0}")]
    QueueUnavailable(String),
    #[error("invalid cluster template: {0}")]
    BadTemplate(String),
}
