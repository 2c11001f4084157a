// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic errors produced by the six compiler passes (§7 "Parse/semantic
//! error", "Type error").

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("duplicate type declaration '{0}'")]
    DuplicateType(String),

    #[error("user type '{0}' targets unknown type '{1}'")]
    UnknownTypeTarget(String, String),

    #[error("duplicate callable declaration '{0}'")]
    DuplicateCallable(String),

    #[error("duplicate parameter name '{0}' in '{1}'")]
    DuplicateParam(String, String),

    #[error("unknown type '{0}' for parameter '{1}'")]
    UnknownParamType(String, String),

    #[error("unknown source language tag '{0}' in stage '{1}'")]
    UnknownSourceLang(String, String),

    #[error("call to unknown callable '{0}'")]
    UnknownCallee(String),

    #[error("duplicate call instance id '{0}'")]
    DuplicateInstanceId(String),

    #[error("call cycle detected at '{0}'")]
    CallCycle(String),

    #[error("binding to unknown parameter '{0}' on callee '{1}'")]
    UnknownBindingParam(String, String),

    #[error("missing required binding for parameter '{0}'")]
    MissingBinding(String),

    #[error("forward or unknown reference to call '{0}'")]
    DanglingCallReference(String),

    #[error("forward or unknown reference to self input '{0}'")]
    DanglingSelfReference(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("top-level call references unknown callable '{0}'")]
    UnknownTopCallee(String),

    #[error("return binds unknown pipeline output '{0}'")]
    UnknownReturnOutput(String),

    #[error("missing return binding for pipeline output '{0}'")]
    MissingReturnBinding(String),
}
