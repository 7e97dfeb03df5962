// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Evaluated values

use super::{Expr, VectorMode};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Concrete result of evaluating an expression tree.
///
/// `Undefined` is a value, not an error: domain failures (division by
/// zero, sqrt of a negative) produce it and it contaminates dependent
/// computations the way a floating-point NaN would. `Symbolic` carries an
/// unevaluated subtree through list results so free variables stay
/// visible downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Vec2(Vec2),
    List(Vec<Value>),
    Symbolic(Box<Expr>),
    Undefined,
}

/// A 2D vector value. Components are always cartesian; `mode` records how
/// the vector was written and how arithmetic treats it (complex vs plain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub coords: Vector2<f64>,
    pub mode: VectorMode,
}

impl Vec2 {
    pub fn new(x: f64, y: f64, mode: VectorMode) -> Self {
        Self {
            coords: Vector2::new(x, y),
            mode,
        }
    }

    pub fn x(&self) -> f64 {
        self.coords.x
    }

    pub fn y(&self) -> f64 {
        self.coords.y
    }

    pub fn is_complex(&self) -> bool {
        self.mode == VectorMode::Complex
    }
}

impl Value {
    /// Wrap a float, folding NaN into `Undefined`.
    pub fn number(n: f64) -> Value {
        if n.is_nan() {
            Value::Undefined
        } else {
            Value::Number(n)
        }
    }

    /// Cartesian vector value. NaN in either component poisons the whole
    /// vector.
    pub fn vec2(x: f64, y: f64, mode: VectorMode) -> Value {
        if x.is_nan() || y.is_nan() {
            Value::Undefined
        } else {
            Value::Vec2(Vec2::new(x, y, mode))
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<&Vec2> {
        match self {
            Value::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Lift a value back into expression form, used when a list-broadcast
    /// element must re-enter a symbolic tree.
    pub fn to_expr(&self) -> Expr {
        match self {
            Value::Number(n) => Expr::Number(*n),
            Value::Bool(b) => Expr::Bool(*b),
            Value::Vec2(v) => {
                // Components are already cartesian; a polar source keeps
                // its numeric meaning only through cartesian form.
                let mode = match v.mode {
                    VectorMode::Polar => VectorMode::Cartesian,
                    other => other,
                };
                Expr::vector(Expr::Number(v.x()), Expr::Number(v.y()), mode)
            }
            Value::List(items) => Expr::List(items.iter().map(Value::to_expr).collect()),
            Value::Symbolic(e) => (**e).clone(),
            Value::Undefined => Expr::Number(f64::NAN),
        }
    }
}
