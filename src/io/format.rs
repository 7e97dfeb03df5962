// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! String templates
//!
//! All printing of expressions, values and definitions routes through a
//! [`StringTemplate`]. The edit template round-trips through the parser
//! (`A=(1,1)` style, no decoration); the display template is for humans;
//! the export template is the stable machine form used in serialized
//! documents.

use crate::construction::{Construction, GeoId};
use crate::expr::{Expr, Op, Value, VectorMode};

/// Which syntax a template selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Parseable, compact, full precision.
    Edit,
    /// Human-facing: spaces after separators, rounded numbers.
    Display,
    /// Stable machine form; compact like edit.
    Export,
}

#[derive(Debug, Clone, Copy)]
pub struct StringTemplate {
    pub kind: TemplateKind,
    /// Decimal places for display rounding.
    digits: u32,
}

impl StringTemplate {
    pub fn edit() -> Self {
        Self {
            kind: TemplateKind::Edit,
            digits: 15,
        }
    }

    pub fn display() -> Self {
        Self {
            kind: TemplateKind::Display,
            digits: 5,
        }
    }

    pub fn export() -> Self {
        Self {
            kind: TemplateKind::Export,
            digits: 15,
        }
    }

    fn spaced(&self) -> bool {
        self.kind == TemplateKind::Display
    }

    fn separator(&self, polar: bool) -> &'static str {
        match (polar, self.spaced()) {
            (true, true) => "; ",
            (true, false) => ";",
            (false, true) => ", ",
            (false, false) => ",",
        }
    }

    pub fn number(&self, n: f64) -> String {
        if n.is_nan() {
            return "?".into();
        }
        if n == n.trunc() && n.abs() < 1e15 {
            return format!("{}", n as i64);
        }
        if self.kind == TemplateKind::Display {
            let factor = 10f64.powi(self.digits as i32);
            let rounded = (n * factor).round() / factor;
            format!("{}", rounded)
        } else {
            format!("{}", n)
        }
    }
}

/// Operator precedence for parenthesization; higher binds tighter.
fn precedence(op: Op) -> u8 {
    match op {
        Op::Or => 1,
        Op::And => 2,
        Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::Eq | Op::Neq => 3,
        Op::Add | Op::Sub => 4,
        Op::Mul | Op::Div => 5,
        Op::Pow => 6,
        Op::Neg | Op::Not => 7,
        _ => 8,
    }
}

/// Render an expression. Geo leaves print as their labels.
pub fn expr_string(expr: &Expr, tpl: &StringTemplate, cons: &Construction) -> String {
    print_expr(expr, tpl, cons, 0)
}

fn print_expr(expr: &Expr, tpl: &StringTemplate, cons: &Construction, parent: u8) -> String {
    match expr {
        Expr::Number(n) => tpl.number(*n),
        Expr::Bool(b) => b.to_string(),
        Expr::Variable(name) => name.clone(),
        Expr::Geo(id) => label_or_placeholder(*id, cons),
        Expr::Vector(v) => {
            let sep = tpl.separator(v.mode == VectorMode::Polar);
            format!(
                "({}{}{})",
                print_expr(&v.x, tpl, cons, 0),
                sep,
                print_expr(&v.y, tpl, cons, 0)
            )
        }
        Expr::List(items) => {
            let sep = tpl.separator(false);
            let body: Vec<String> = items
                .iter()
                .map(|item| print_expr(item, tpl, cons, 0))
                .collect();
            format!("{{{}}}", body.join(sep))
        }
        Expr::Apply { op, args } => {
            if op.is_function() {
                let body: Vec<String> = args
                    .iter()
                    .map(|arg| print_expr(arg, tpl, cons, 0))
                    .collect();
                return format!("{}({})", op.name(), body.join(tpl.separator(false)));
            }
            let prec = precedence(*op);
            let rendered = match op.arity() {
                1 => format!("{}{}", op.name(), print_expr(&args[0], tpl, cons, prec)),
                _ => {
                    let infix = if tpl.spaced() {
                        format!(" {} ", op.name())
                    } else {
                        op.name().to_string()
                    };
                    // Right operand of a left-associative operator needs
                    // parens at equal precedence; `^` associates right.
                    let (lp, rp) = if *op == Op::Pow {
                        (prec + 1, prec)
                    } else {
                        (prec, prec + 1)
                    };
                    format!(
                        "{}{}{}",
                        print_expr(&args[0], tpl, cons, lp),
                        infix,
                        print_expr(&args[1], tpl, cons, rp)
                    )
                }
            };
            if prec < parent {
                format!("({})", rendered)
            } else {
                rendered
            }
        }
    }
}

fn label_or_placeholder(id: GeoId, cons: &Construction) -> String {
    cons.geo(id)
        .map(|g| g.label().to_string())
        .unwrap_or_else(|| format!("#{}", id.index()))
}

/// Render an evaluated value.
pub fn value_string(value: &Value, tpl: &StringTemplate, cons: &Construction) -> String {
    match value {
        Value::Number(n) => tpl.number(*n),
        Value::Bool(b) => b.to_string(),
        Value::Vec2(v) => {
            if v.mode == VectorMode::Complex && tpl.kind == TemplateKind::Display {
                let re = tpl.number(v.x());
                if v.y() < 0.0 {
                    format!("{} - {}i", re, tpl.number(-v.y()))
                } else {
                    format!("{} + {}i", re, tpl.number(v.y()))
                }
            } else {
                format!(
                    "({}{}{})",
                    tpl.number(v.x()),
                    tpl.separator(false),
                    tpl.number(v.y())
                )
            }
        }
        Value::List(items) => {
            let body: Vec<String> = items
                .iter()
                .map(|item| value_string(item, tpl, cons))
                .collect();
            format!("{{{}}}", body.join(tpl.separator(false)))
        }
        Value::Symbolic(e) => expr_string(e, tpl, cons),
        Value::Undefined => "?".into(),
    }
}

/// Full textual definition of an object: `label=definition`. Free
/// objects print their value, dependent objects their defining
/// expression. This is the interchange format at the UI boundary and the
/// content captured by undo items.
pub fn definition_string(id: GeoId, tpl: &StringTemplate, cons: &Construction) -> Option<String> {
    let geo = cons.geo(id)?;
    let eq = if tpl.spaced() { " = " } else { "=" };
    let body = match cons.definition_expr(id) {
        Some(expr) => expr_string(expr, tpl, cons),
        None => value_string(geo.value(), tpl, cons),
    };
    Some(format!("{}{}{}", geo.label(), eq, body))
}
