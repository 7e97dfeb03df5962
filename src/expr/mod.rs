// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Expression tree module
//!
//! Defines the expression tree, its evaluated values, the strict
//! evaluator, and the rewriting traversal engine.

mod node;
mod value;
mod evaluator;
mod traversal;

pub use node::{Expr, Op, VecExpr, VectorMode};
pub use value::{Value, Vec2};
pub use evaluator::{evaluate, Resolver};
pub use traversal::{
    ConstantFolder, GeoCollector, GeoReplacer, Traversing, VariableCollector, VariableReplacer,
};
