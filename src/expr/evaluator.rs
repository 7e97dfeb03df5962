// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Strict expression evaluator
//!
//! Children evaluate first, then the operation applies via a dispatch
//! table keyed by the operation tag. Domain failures produce
//! `Value::Undefined`; only structurally broken trees (wrong arity) raise
//! an [`EvalFault`], which is fatal to that single evaluation.

use super::{Expr, Op, Value, VecExpr, VectorMode};
use crate::construction::GeoId;
use crate::error::EvalFault;
use ahash::AHashMap;

/// Resolves geo-reference leaves against the construction arena.
pub trait Resolver {
    fn resolve(&self, id: GeoId) -> Value;
}

/// Resolver for pure expressions: every geo reference is undefined.
impl Resolver for () {
    fn resolve(&self, _id: GeoId) -> Value {
        Value::Undefined
    }
}

impl Resolver for AHashMap<GeoId, Value> {
    fn resolve(&self, id: GeoId) -> Value {
        self.get(&id).cloned().unwrap_or(Value::Undefined)
    }
}

/// Evaluate an expression tree to a concrete value.
pub fn evaluate(expr: &Expr, ctx: &dyn Resolver) -> Result<Value, EvalFault> {
    match expr {
        Expr::Number(n) => Ok(Value::number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        // A free variable outside the list-broadcast residue rule has no
        // numeric meaning.
        Expr::Variable(_) => Ok(Value::Undefined),
        Expr::Geo(id) => Ok(ctx.resolve(*id)),
        Expr::Vector(v) => evaluate_vector(v, ctx),
        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(evaluate(item, ctx)?);
            }
            Ok(Value::List(out))
        }
        Expr::Apply { op, args } => {
            if args.len() != op.arity() {
                return Err(EvalFault::Arity {
                    op: op.name(),
                    expected: op.arity(),
                    got: args.len(),
                });
            }
            if op.arity() == 1 {
                let v = evaluate(&args[0], ctx)?;
                Ok(apply_unary(*op, &v))
            } else {
                let lv = evaluate(&args[0], ctx)?;
                let rv = evaluate(&args[1], ctx)?;
                if matches!(lv, Value::List(_)) || matches!(rv, Value::List(_)) {
                    broadcast_binary(*op, &args[0], lv, &args[1], rv)
                } else {
                    Ok(apply_binary(*op, &lv, &rv))
                }
            }
        }
    }
}

/// One side of a broadcast: a concrete value, or the original unevaluated
/// subtree kept because it contains a free function variable.
enum Operand {
    Val(Value),
    Residue(Expr),
}

impl Operand {
    fn scalar(expr: &Expr, value: Value) -> Operand {
        if !matches!(value, Value::List(_)) && expr.contains_free_variable() {
            // Undo evaluation to keep variables visible downstream.
            Operand::Residue(expr.clone())
        } else {
            Operand::Val(value)
        }
    }

    fn element(&self, idx: usize) -> Operand {
        match self {
            Operand::Val(Value::List(items)) => {
                Operand::Val(items.get(idx).cloned().unwrap_or(Value::Undefined))
            }
            Operand::Val(v) => Operand::Val(v.clone()),
            Operand::Residue(e) => Operand::Residue(e.clone()),
        }
    }

    fn to_expr(&self) -> Expr {
        match self {
            Operand::Val(v) => v.to_expr(),
            Operand::Residue(e) => e.clone(),
        }
    }
}

/// Element-wise application of a binary operation where at least one
/// operand is a list. Pairs positionally, truncating to the shorter list;
/// scalars repeat for every position.
fn broadcast_binary(
    op: Op,
    left_expr: &Expr,
    left_val: Value,
    right_expr: &Expr,
    right_val: Value,
) -> Result<Value, EvalFault> {
    let mut size = 0;
    let mut max_size = usize::MAX;
    if let Value::List(items) = &left_val {
        size = items.len();
        max_size = size;
    }
    if let Value::List(items) = &right_val {
        size = items.len().min(max_size);
    }

    let left = Operand::scalar(left_expr, left_val);
    let right = Operand::scalar(right_expr, right_val);

    let mut out = Vec::with_capacity(size);
    for idx in 0..size {
        let l = left.element(idx);
        let r = right.element(idx);
        match (&l, &r) {
            (Operand::Val(a), Operand::Val(b)) => out.push(apply_binary(op, a, b)),
            _ => out.push(Value::Symbolic(Box::new(Expr::binary(
                op,
                l.to_expr(),
                r.to_expr(),
            )))),
        }
    }
    Ok(Value::List(out))
}

/// Vector node evaluation: polar interpretation and the coordinate-level
/// list broadcast.
fn evaluate_vector(v: &VecExpr, ctx: &dyn Resolver) -> Result<Value, EvalFault> {
    let xv = evaluate(&v.x, ctx)?;
    let yv = evaluate(&v.y, ctx)?;

    if matches!(xv, Value::List(_)) || matches!(yv, Value::List(_)) {
        let mut size = 0;
        let mut max_size = usize::MAX;
        if let Value::List(items) = &xv {
            size = items.len();
            max_size = size;
        }
        if let Value::List(items) = &yv {
            size = items.len().min(max_size);
        }

        let x = Operand::scalar(&v.x, xv);
        let y = Operand::scalar(&v.y, yv);

        let mut out = Vec::with_capacity(size);
        for idx in 0..size {
            let xi = x.element(idx);
            let yi = y.element(idx);
            match (&xi, &yi) {
                (Operand::Val(a), Operand::Val(b)) => out.push(vector_value(a, b, v.mode)),
                _ => out.push(Value::Symbolic(Box::new(Expr::vector(
                    xi.to_expr(),
                    yi.to_expr(),
                    v.mode,
                )))),
            }
        }
        return Ok(Value::List(out));
    }

    Ok(vector_value(&xv, &yv, v.mode))
}

fn vector_value(x: &Value, y: &Value, mode: VectorMode) -> Value {
    let (Some(a), Some(b)) = (x.as_number(), y.as_number()) else {
        return Value::Undefined;
    };
    match mode {
        // (r, phi) -> (r cos phi, r sin phi); negative r is allowed.
        VectorMode::Polar => Value::vec2(a * b.cos(), a * b.sin(), mode),
        _ => Value::vec2(a, b, mode),
    }
}

fn apply_unary(op: Op, v: &Value) -> Value {
    match v {
        Value::Undefined => return Value::Undefined,
        // Unary operations map over lists element-wise.
        Value::List(items) => {
            return Value::List(items.iter().map(|item| apply_unary(op, item)).collect())
        }
        Value::Symbolic(e) => {
            return Value::Symbolic(Box::new(Expr::unary(op, (**e).clone())));
        }
        _ => {}
    }
    match op {
        Op::Neg => match v {
            Value::Number(n) => Value::number(-n),
            Value::Vec2(vec) => Value::vec2(-vec.x(), -vec.y(), vec.mode),
            _ => Value::Undefined,
        },
        Op::Not => match v.as_bool() {
            Some(b) => Value::Bool(!b),
            None => Value::Undefined,
        },
        Op::Sqrt => match v.as_number() {
            Some(n) if n >= 0.0 => Value::number(n.sqrt()),
            _ => Value::Undefined,
        },
        Op::Sin => num_unary(v, f64::sin),
        Op::Cos => num_unary(v, f64::cos),
        Op::Tan => num_unary(v, f64::tan),
        Op::Exp => num_unary(v, f64::exp),
        Op::Abs => match v {
            Value::Number(n) => Value::number(n.abs()),
            // Length of a vector, modulus of a complex number.
            Value::Vec2(vec) => Value::number(vec.coords.norm()),
            _ => Value::Undefined,
        },
        Op::Ln => match v.as_number() {
            Some(n) if n > 0.0 => Value::number(n.ln()),
            _ => Value::Undefined,
        },
        Op::XCoord => match v.as_vec2() {
            Some(vec) => Value::number(vec.x()),
            None => Value::Undefined,
        },
        Op::YCoord => match v.as_vec2() {
            Some(vec) => Value::number(vec.y()),
            None => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn num_unary(v: &Value, f: fn(f64) -> f64) -> Value {
    match v.as_number() {
        Some(n) => Value::number(f(n)),
        None => Value::Undefined,
    }
}

fn apply_binary(op: Op, l: &Value, r: &Value) -> Value {
    if !l.is_defined() || !r.is_defined() {
        return Value::Undefined;
    }
    // A symbolic operand keeps the whole application symbolic.
    if matches!(l, Value::Symbolic(_)) || matches!(r, Value::Symbolic(_)) {
        return Value::Symbolic(Box::new(Expr::binary(op, l.to_expr(), r.to_expr())));
    }
    match op {
        Op::Add => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::number(a + b),
            (Value::Vec2(a), Value::Vec2(b)) => {
                Value::vec2(a.x() + b.x(), a.y() + b.y(), join_mode(a.mode, b.mode))
            }
            // A real number coerces to (a, 0) next to a complex operand.
            (Value::Number(a), Value::Vec2(b)) if b.is_complex() => {
                Value::vec2(a + b.x(), b.y(), VectorMode::Complex)
            }
            (Value::Vec2(a), Value::Number(b)) if a.is_complex() => {
                Value::vec2(a.x() + b, a.y(), VectorMode::Complex)
            }
            _ => Value::Undefined,
        },
        Op::Sub => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::number(a - b),
            (Value::Vec2(a), Value::Vec2(b)) => {
                Value::vec2(a.x() - b.x(), a.y() - b.y(), join_mode(a.mode, b.mode))
            }
            (Value::Number(a), Value::Vec2(b)) if b.is_complex() => {
                Value::vec2(a - b.x(), -b.y(), VectorMode::Complex)
            }
            (Value::Vec2(a), Value::Number(b)) if a.is_complex() => {
                Value::vec2(a.x() - b, a.y(), VectorMode::Complex)
            }
            _ => Value::Undefined,
        },
        Op::Mul => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::number(a * b),
            (Value::Number(a), Value::Vec2(b)) => Value::vec2(a * b.x(), a * b.y(), b.mode),
            (Value::Vec2(a), Value::Number(b)) => Value::vec2(a.x() * b, a.y() * b, a.mode),
            (Value::Vec2(a), Value::Vec2(b)) => {
                if a.is_complex() || b.is_complex() {
                    // (a+bi)(c+di)
                    Value::vec2(
                        a.x() * b.x() - a.y() * b.y(),
                        a.x() * b.y() + a.y() * b.x(),
                        VectorMode::Complex,
                    )
                } else {
                    Value::number(a.coords.dot(&b.coords))
                }
            }
            _ => Value::Undefined,
        },
        Op::Div => match (l, r) {
            (Value::Number(a), Value::Number(b)) => {
                if *b == 0.0 {
                    Value::Undefined
                } else {
                    Value::number(a / b)
                }
            }
            (Value::Vec2(a), Value::Number(b)) => {
                if *b == 0.0 {
                    Value::Undefined
                } else {
                    Value::vec2(a.x() / b, a.y() / b, a.mode)
                }
            }
            (Value::Vec2(a), Value::Vec2(b)) if a.is_complex() || b.is_complex() => {
                complex_div(a.x(), a.y(), b.x(), b.y())
            }
            (Value::Number(a), Value::Vec2(b)) if b.is_complex() => {
                complex_div(*a, 0.0, b.x(), b.y())
            }
            _ => Value::Undefined,
        },
        Op::Pow => match (l, r) {
            (Value::Number(a), Value::Number(b)) => {
                if *a == 0.0 && *b == 0.0 {
                    Value::Undefined
                } else {
                    Value::number(a.powf(*b))
                }
            }
            _ => Value::Undefined,
        },
        Op::Lt => num_cmp(l, r, |a, b| a < b),
        Op::Le => num_cmp(l, r, |a, b| a <= b),
        Op::Gt => num_cmp(l, r, |a, b| a > b),
        Op::Ge => num_cmp(l, r, |a, b| a >= b),
        Op::Eq => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::Bool(a == b),
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(a == b),
            (Value::Vec2(a), Value::Vec2(b)) => Value::Bool(a.coords == b.coords),
            _ => Value::Undefined,
        },
        Op::Neq => match apply_binary(Op::Eq, l, r) {
            Value::Bool(b) => Value::Bool(!b),
            other => other,
        },
        Op::And => match (l.as_bool(), r.as_bool()) {
            (Some(a), Some(b)) => Value::Bool(a && b),
            _ => Value::Undefined,
        },
        Op::Or => match (l.as_bool(), r.as_bool()) {
            (Some(a), Some(b)) => Value::Bool(a || b),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn complex_div(ax: f64, ay: f64, bx: f64, by: f64) -> Value {
    let denom = bx * bx + by * by;
    if denom == 0.0 {
        Value::Undefined
    } else {
        Value::vec2(
            (ax * bx + ay * by) / denom,
            (ay * bx - ax * by) / denom,
            VectorMode::Complex,
        )
    }
}

fn join_mode(a: VectorMode, b: VectorMode) -> VectorMode {
    if a == VectorMode::Complex || b == VectorMode::Complex {
        VectorMode::Complex
    } else {
        VectorMode::Cartesian
    }
}

fn num_cmp(l: &Value, r: &Value, f: fn(f64, f64) -> bool) -> Value {
    match (l.as_number(), r.as_number()) {
        (Some(a), Some(b)) => Value::Bool(f(a, b)),
        _ => Value::Undefined,
    }
}

impl Expr {
    /// Convenience wrapper over [`evaluate`].
    pub fn evaluate(&self, ctx: &dyn Resolver) -> Result<Value, EvalFault> {
        evaluate(self, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    #[test]
    fn test_strict_arithmetic() {
        let e = Expr::binary(Op::Add, num(2.0), Expr::binary(Op::Mul, num(3.0), num(4.0)));
        assert_eq!(e.evaluate(&()).unwrap(), Value::Number(14.0));
    }

    #[test]
    fn test_division_by_zero_is_undefined() {
        let e = Expr::binary(Op::Div, num(1.0), num(0.0));
        assert_eq!(e.evaluate(&()).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_sqrt_of_negative_is_undefined() {
        let e = Expr::unary(Op::Sqrt, num(-4.0));
        assert_eq!(e.evaluate(&()).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_undefined_propagates() {
        let e = Expr::binary(Op::Add, num(1.0), Expr::binary(Op::Div, num(1.0), num(0.0)));
        assert_eq!(e.evaluate(&()).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_polar_vector() {
        let e = Expr::vector(num(2.0), num(std::f64::consts::FRAC_PI_2), VectorMode::Polar);
        let v = e.evaluate(&()).unwrap();
        let vec = v.as_vec2().unwrap();
        assert_relative_eq!(vec.x(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(vec.y(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_polar_radius_not_normalized() {
        let e = Expr::vector(num(-1.0), num(0.0), VectorMode::Polar);
        let v = e.evaluate(&()).unwrap();
        let vec = v.as_vec2().unwrap();
        assert_relative_eq!(vec.x(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(vec.y(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_list_scalar_broadcast() {
        // 10 + {1, 2, 3} -> {11, 12, 13}
        let list = Expr::List(vec![num(1.0), num(2.0), num(3.0)]);
        let e = Expr::binary(Op::Add, num(10.0), list);
        let v = e.evaluate(&()).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Number(11.0),
                Value::Number(12.0),
                Value::Number(13.0)
            ])
        );
    }

    #[test]
    fn test_list_list_broadcast_truncates_to_shorter() {
        let a = Expr::List(vec![num(1.0), num(2.0), num(3.0)]);
        let b = Expr::List(vec![num(10.0), num(20.0)]);
        let e = Expr::binary(Op::Add, a, b);
        let v = e.evaluate(&()).unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::Number(11.0), Value::Number(22.0)])
        );
    }

    #[test]
    fn test_free_variable_scalar_keeps_symbolic_residue() {
        // t + {1, 2}: the scalar side contains a free variable, so each
        // element keeps the unevaluated form instead of collapsing to
        // undefined.
        let t = Expr::Variable("t".into());
        let list = Expr::List(vec![num(1.0), num(2.0)]);
        let e = Expr::binary(Op::Add, t.clone(), list);
        let v = e.evaluate(&()).unwrap();
        let items = v.as_list().unwrap();
        assert_eq!(items.len(), 2);
        match &items[0] {
            Value::Symbolic(inner) => {
                assert_eq!(**inner, Expr::binary(Op::Add, t.clone(), num(1.0)));
            }
            other => panic!("expected symbolic residue, got {:?}", other),
        }
    }

    #[test]
    fn test_vector_coordinate_broadcast() {
        // (t, {1, 2}) -> { (t, 1), (t, 2) } with t kept symbolic
        let e = Expr::vector(
            Expr::Variable("t".into()),
            Expr::List(vec![num(1.0), num(2.0)]),
            VectorMode::Cartesian,
        );
        let v = e.evaluate(&()).unwrap();
        let items = v.as_list().unwrap();
        assert_eq!(items.len(), 2);
        for item in items {
            assert!(matches!(item, Value::Symbolic(_)));
        }
    }

    #[test]
    fn test_complex_multiplication() {
        // i * i = -1
        let i = Expr::vector(num(0.0), num(1.0), VectorMode::Complex);
        let e = Expr::binary(Op::Mul, i.clone(), i);
        let v = e.evaluate(&()).unwrap();
        let vec = v.as_vec2().unwrap();
        assert_relative_eq!(vec.x(), -1.0);
        assert_relative_eq!(vec.y(), 0.0);
    }

    #[test]
    fn test_vector_dot_product() {
        let a = Expr::vector(num(1.0), num(2.0), VectorMode::Cartesian);
        let b = Expr::vector(num(3.0), num(4.0), VectorMode::Cartesian);
        let e = Expr::binary(Op::Mul, a, b);
        assert_eq!(e.evaluate(&()).unwrap(), Value::Number(11.0));
    }

    #[test]
    fn test_arity_fault() {
        let broken = Expr::Apply {
            op: Op::Add,
            args: vec![num(1.0)],
        };
        assert!(broken.evaluate(&()).is_err());
    }

    #[test]
    fn test_deep_copy_evaluates_identically() {
        let e = Expr::binary(
            Op::Mul,
            Expr::vector(num(1.0), num(2.0), VectorMode::Cartesian),
            Expr::vector(num(3.0), num(4.0), VectorMode::Cartesian),
        );
        let copy = e.clone();
        assert_eq!(e.evaluate(&()).unwrap(), copy.evaluate(&()).unwrap());
    }
}
