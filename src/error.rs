// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Error taxonomy for the construction kernel

use thiserror::Error;

/// Errors surfaced to callers of the kernel.
///
/// `Undefined` results are deliberately absent here: a domain error during
/// evaluation (division by zero, sqrt of a negative) is an ordinary
/// [`Value::Undefined`](crate::expr::Value::Undefined) that propagates
/// through dependent computations like a floating-point NaN.
#[derive(Debug, Error)]
pub enum FiguraError {
    /// Malformed input text. Aborts the statement with no state change.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The attempted definition would close a dependency cycle.
    /// Rejected atomically: no partial graph mutation is observable.
    #[error("circular definition involving '{label}'")]
    CircularDefinition { label: String },

    /// Deletion blocked because other objects still depend on this one
    /// and cascading delete is disabled.
    #[error("'{label}' is still referenced by {dependents:?}")]
    StillReferenced {
        label: String,
        dependents: Vec<String>,
    },

    /// An explicit label is already taken by another object.
    #[error("label '{label}' is already in use")]
    DuplicateLabel { label: String },

    /// Lookup of an object that does not exist (or was deleted).
    #[error("unknown object '{label}'")]
    UnknownObject { label: String },
}

impl FiguraError {
    pub fn parse(message: impl Into<String>) -> Self {
        FiguraError::Parse {
            message: message.into(),
        }
    }
}

/// Internal programming error raised by a malformed tree (wrong arity,
/// impossible operand shape). Fatal to the single evaluation that raised
/// it; the kernel logs it and records an undefined result, leaving the
/// rest of the construction usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalFault {
    #[error("operation {op} expected {expected} operands, got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },
}
