// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Figura construction kernel
//!
//! A dynamic-geometry core: symbolic/numeric expression trees, a
//! dependency-tracked construction graph with topological recompute, and
//! a textual undo/redo store behind a single-threaded kernel facade.

pub mod expr;
pub mod construction;
pub mod undo;
pub mod io;
pub mod kernel;
pub mod error;

pub use construction::{Construction, GeoElement, GeoEvent, GeoId, GeoKind, GeoState};
pub use error::{EvalFault, FiguraError};
pub use expr::{Expr, Op, Traversing, Value, VectorMode};
pub use io::{parse_statements, StringTemplate};
pub use kernel::{ConstructionListener, Kernel, RequestId};
pub use undo::{MoveMode, UndoManager, UpdateActionStore};

/// Evaluate a script into a fresh kernel.
pub fn evaluate_script(source: &str) -> Result<Kernel, FiguraError> {
    let mut kernel = Kernel::new();
    kernel.parse_and_evaluate(source)?;
    Ok(kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_script() {
        let kernel = evaluate_script("a=2; b=a*3").unwrap();
        let b = kernel.lookup("b").unwrap();
        assert_eq!(kernel.value(b), Value::Number(6.0));
    }
}
