// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Algorithm nodes

use crate::construction::GeoId;
use crate::error::EvalFault;
use crate::expr::{evaluate, Expr, Resolver, Value};
use serde::{Deserialize, Serialize};

/// Handle of an algorithm node in the construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AlgoId(u32);

impl AlgoId {
    pub fn from_raw(raw: u32) -> Self {
        AlgoId(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A deterministic computation from declared input objects to one output
/// object, backed by a defining expression. The input set is exactly the
/// geo leaves of the expression, fixed at construction; dependency edges
/// in the graph are derived from it.
#[derive(Debug, Clone)]
pub struct Algorithm {
    pub(crate) id: AlgoId,
    pub(crate) expr: Expr,
    pub(crate) inputs: Vec<GeoId>,
    pub(crate) output: GeoId,
}

impl Algorithm {
    pub(crate) fn new(id: AlgoId, expr: Expr, output: GeoId) -> Self {
        let mut inputs: Vec<GeoId> = expr.collect_geos().into_iter().collect();
        inputs.sort();
        Self {
            id,
            expr,
            inputs,
            output,
        }
    }

    pub fn id(&self) -> AlgoId {
        self.id
    }

    pub fn inputs(&self) -> &[GeoId] {
        &self.inputs
    }

    pub fn output(&self) -> GeoId {
        self.output
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Re-evaluate the defining expression against current input values.
    pub fn compute(&self, ctx: &dyn Resolver) -> Result<Value, EvalFault> {
        evaluate(&self.expr, ctx)
    }
}
