// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Expression node definitions

use crate::construction::GeoId;
use serde::{Deserialize, Serialize};

/// A node of the expression tree.
///
/// Leaves are numbers, booleans, free variables and non-owning references
/// to construction objects; composites are vectors, lists and operation
/// applications. A composite owns its children exclusively, so `Clone` is
/// a deep copy. The exception is `Geo` leaves, which copy the arena
/// handle and never the referenced object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    /// Free function variable, kept symbolic until substituted.
    Variable(String),
    /// Handle of a construction object; resolved against the arena at
    /// evaluation time.
    Geo(GeoId),
    /// 2-ary vector with a coordinate mode.
    Vector(Box<VecExpr>),
    List(Vec<Expr>),
    /// Operation application. Invariant: `args.len() == op.arity()`.
    Apply { op: Op, args: Vec<Expr> },
}

/// Coordinate mode of a vector expression. Changing the mode changes
/// evaluation/presentation semantics only, never the arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorMode {
    Cartesian,
    Polar,
    Complex,
    CasVector,
}

/// 2-ary vector expression: coordinates plus mode.
///
/// In `Polar` mode the children are interpreted as `(r, phi)` and
/// evaluate to `(r*cos(phi), r*sin(phi))`; a negative radius is allowed
/// and not normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VecExpr {
    pub x: Expr,
    pub y: Expr,
    pub mode: VectorMode,
}

/// Operations of composite nodes, with fixed arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    // Unary
    Neg,
    Not,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Abs,
    Ln,
    Exp,
    XCoord,
    YCoord,
    // Binary
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Neq,
    And,
    Or,
}

impl Op {
    /// Number of children an application of this operation carries.
    pub fn arity(&self) -> usize {
        match self {
            Op::Neg
            | Op::Not
            | Op::Sqrt
            | Op::Sin
            | Op::Cos
            | Op::Tan
            | Op::Abs
            | Op::Ln
            | Op::Exp
            | Op::XCoord
            | Op::YCoord => 1,
            _ => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Neg => "-",
            Op::Not => "!",
            Op::Sqrt => "sqrt",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::Abs => "abs",
            Op::Ln => "ln",
            Op::Exp => "exp",
            Op::XCoord => "x",
            Op::YCoord => "y",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Pow => "^",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "==",
            Op::Neq => "!=",
            Op::And => "&&",
            Op::Or => "||",
        }
    }

    /// Function-call style operations (printed as `name(arg)` rather than
    /// infix/prefix).
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Op::Sqrt
                | Op::Sin
                | Op::Cos
                | Op::Tan
                | Op::Abs
                | Op::Ln
                | Op::Exp
                | Op::XCoord
                | Op::YCoord
        )
    }
}

impl Expr {
    /// Build an operation node. Arity is a structural invariant; the
    /// typed helpers below cannot violate it, this generic form asserts.
    pub fn apply(op: Op, args: Vec<Expr>) -> Expr {
        debug_assert_eq!(op.arity(), args.len(), "arity mismatch for {:?}", op);
        Expr::Apply { op, args }
    }

    pub fn unary(op: Op, arg: Expr) -> Expr {
        Expr::apply(op, vec![arg])
    }

    pub fn binary(op: Op, left: Expr, right: Expr) -> Expr {
        Expr::apply(op, vec![left, right])
    }

    pub fn vector(x: Expr, y: Expr, mode: VectorMode) -> Expr {
        Expr::Vector(Box::new(VecExpr { x, y, mode }))
    }

    /// Immutable view of the direct children.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Vector(v) => vec![&v.x, &v.y],
            Expr::List(items) => items.iter().collect(),
            Expr::Apply { args, .. } => args.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Mutable view of the direct children, used by the traversal engine.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Vector(v) => vec![&mut v.x, &mut v.y],
            Expr::List(items) => items.iter_mut().collect(),
            Expr::Apply { args, .. } => args.iter_mut().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Number(_) | Expr::Bool(_) | Expr::Variable(_) | Expr::Geo(_)
        )
    }

    /// True when the subtree contains neither free variables nor geo
    /// references, so it evaluates to the same value in any context.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Variable(_) | Expr::Geo(_) => false,
            _ => self.children().into_iter().all(Expr::is_constant),
        }
    }

    /// True when the subtree contains a free function variable. The list
    /// broadcast keeps such subtrees unevaluated to preserve symbols.
    pub fn contains_free_variable(&self) -> bool {
        match self {
            Expr::Variable(_) => true,
            _ => self
                .children()
                .into_iter()
                .any(Expr::contains_free_variable),
        }
    }

    /// True when the subtree references the given construction object.
    pub fn references(&self, id: GeoId) -> bool {
        match self {
            Expr::Geo(g) => *g == id,
            _ => self.children().into_iter().any(|c| c.references(id)),
        }
    }
}
