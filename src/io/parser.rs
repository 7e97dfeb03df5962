// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Command parser using pest
//!
//! Parsing is purely syntactic: identifiers come out as free variables
//! (except lexical constants) and the kernel resolves them against the
//! construction in a later traversal pass.

use crate::error::FiguraError;
use crate::expr::{Expr, Op, VectorMode};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "io/command.pest"]
struct CommandParser;

/// One parsed statement: an optional target label and the defining
/// expression, unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub label: Option<String>,
    pub expr: Expr,
}

/// Parse a script of `;`/newline-separated statements. A malformed
/// script fails as a whole; nothing is applied.
pub fn parse_statements(source: &str) -> Result<Vec<Statement>, FiguraError> {
    let mut pairs = CommandParser::parse(Rule::program, source)
        .map_err(|e| FiguraError::parse(e.to_string()))?;

    let mut statements = Vec::new();
    if let Some(program) = pairs.next() {
        for pair in program.into_inner() {
            match pair.as_rule() {
                Rule::statement => statements.push(parse_statement(pair)?),
                Rule::EOI => {}
                _ => {}
            }
        }
    }
    Ok(statements)
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement, FiguraError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| FiguraError::parse("empty statement"))?;

    match inner.as_rule() {
        Rule::assignment => {
            let mut parts = inner.into_inner();
            let label = parts.next().expect("grammar: label").as_str().to_string();
            let expr = build_expression(parts.next().expect("grammar: expression"))?;
            Ok(Statement {
                label: Some(label),
                expr,
            })
        }
        Rule::expression => Ok(Statement {
            label: None,
            expr: build_expression(inner)?,
        }),
        other => Err(FiguraError::parse(format!(
            "unexpected statement part: {:?}",
            other
        ))),
    }
}

fn build_expression(pair: Pair<Rule>) -> Result<Expr, FiguraError> {
    match pair.as_rule() {
        Rule::expression | Rule::group => {
            build_expression(pair.into_inner().next().expect("grammar: inner"))
        }
        Rule::or_expr => fold_left(pair, |_| Op::Or),
        Rule::and_expr => fold_left(pair, |_| Op::And),
        Rule::cmp_expr => {
            let mut inner = pair.into_inner();
            let left = build_expression(inner.next().expect("grammar: operand"))?;
            match inner.next() {
                Some(op_pair) => {
                    let op = match op_pair.as_str() {
                        "<" => Op::Lt,
                        "<=" => Op::Le,
                        ">" => Op::Gt,
                        ">=" => Op::Ge,
                        "==" => Op::Eq,
                        "!=" => Op::Neq,
                        other => return Err(FiguraError::parse(format!("bad operator {other}"))),
                    };
                    let right = build_expression(inner.next().expect("grammar: rhs"))?;
                    Ok(Expr::binary(op, left, right))
                }
                None => Ok(left),
            }
        }
        Rule::add_expr => fold_left(pair, |s| if s == "+" { Op::Add } else { Op::Sub }),
        Rule::mul_expr => fold_left(pair, |s| if s == "*" { Op::Mul } else { Op::Div }),
        Rule::unary_expr => build_expression(pair.into_inner().next().expect("grammar: inner")),
        Rule::neg_expr => {
            let inner = pair.into_inner().next().expect("grammar: operand");
            Ok(Expr::unary(Op::Neg, build_expression(inner)?))
        }
        Rule::not_expr => {
            let inner = pair.into_inner().next().expect("grammar: operand");
            Ok(Expr::unary(Op::Not, build_expression(inner)?))
        }
        Rule::pow_expr => {
            let mut inner = pair.into_inner();
            let base = build_expression(inner.next().expect("grammar: base"))?;
            match inner.next() {
                Some(exp) => Ok(Expr::binary(Op::Pow, base, build_expression(exp)?)),
                None => Ok(base),
            }
        }
        Rule::atom => build_expression(pair.into_inner().next().expect("grammar: atom")),
        Rule::number => {
            let text = pair.as_str();
            text.parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| FiguraError::parse(format!("invalid number '{text}'")))
        }
        Rule::boolean => Ok(Expr::Bool(pair.as_str() == "true")),
        Rule::vector => {
            let mut inner = pair.into_inner();
            let x = build_expression(inner.next().expect("grammar: x"))?;
            let sep = inner.next().expect("grammar: separator");
            let mode = if sep.as_str() == ";" {
                VectorMode::Polar
            } else {
                VectorMode::Cartesian
            };
            let y = build_expression(inner.next().expect("grammar: y"))?;
            Ok(Expr::vector(x, y, mode))
        }
        Rule::list => {
            let items: Result<Vec<Expr>, _> =
                pair.into_inner().map(build_expression).collect();
            Ok(Expr::List(items?))
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().expect("grammar: name").as_str();
            let args: Result<Vec<Expr>, _> = inner.map(build_expression).collect();
            build_call(name, args?)
        }
        Rule::ident => Ok(resolve_constant(pair.as_str())),
        other => Err(FiguraError::parse(format!("unexpected rule {:?}", other))),
    }
}

/// Left-associative fold of `operand (op operand)*` levels.
fn fold_left(pair: Pair<Rule>, to_op: fn(&str) -> Op) -> Result<Expr, FiguraError> {
    let mut inner = pair.into_inner();
    let mut acc = build_expression(inner.next().expect("grammar: operand"))?;
    while let Some(next) = inner.next() {
        match next.as_rule() {
            Rule::add_op | Rule::mul_op => {
                let op = to_op(next.as_str());
                let rhs = build_expression(inner.next().expect("grammar: rhs"))?;
                acc = Expr::binary(op, acc, rhs);
            }
            // or_expr / and_expr carry no operator pair between operands.
            _ => {
                let op = to_op("");
                acc = Expr::binary(op, acc, build_expression(next)?);
            }
        }
    }
    Ok(acc)
}

fn unary_fn(name: &str) -> Option<Op> {
    match name {
        "sqrt" => Some(Op::Sqrt),
        "sin" => Some(Op::Sin),
        "cos" => Some(Op::Cos),
        "tan" => Some(Op::Tan),
        "abs" => Some(Op::Abs),
        "ln" => Some(Op::Ln),
        "exp" => Some(Op::Exp),
        "x" => Some(Op::XCoord),
        "y" => Some(Op::YCoord),
        _ => None,
    }
}

/// Function calls: built-in unary functions plus command forms that
/// desugar to plain expressions.
fn build_call(name: &str, mut args: Vec<Expr>) -> Result<Expr, FiguraError> {
    if let Some(op) = unary_fn(name) {
        if args.len() != 1 {
            return Err(FiguraError::parse(format!(
                "{name}() expects 1 argument, got {}",
                args.len()
            )));
        }
        return Ok(Expr::unary(op, args.remove(0)));
    }
    match name {
        "Midpoint" => {
            if args.len() != 2 {
                return Err(FiguraError::parse("Midpoint expects 2 arguments"));
            }
            let b = args.pop().expect("checked");
            let a = args.pop().expect("checked");
            Ok(Expr::binary(
                Op::Div,
                Expr::binary(Op::Add, a, b),
                Expr::Number(2.0),
            ))
        }
        "Distance" => {
            if args.len() != 2 {
                return Err(FiguraError::parse("Distance expects 2 arguments"));
            }
            let b = args.pop().expect("checked");
            let a = args.pop().expect("checked");
            Ok(Expr::unary(Op::Abs, Expr::binary(Op::Sub, a, b)))
        }
        _ => Err(FiguraError::parse(format!("unknown function '{name}'"))),
    }
}

/// Lexical constants; everything else is a free variable until the
/// kernel resolves labels.
fn resolve_constant(name: &str) -> Expr {
    match name {
        "pi" => Expr::Number(std::f64::consts::PI),
        "i" => Expr::vector(Expr::Number(0.0), Expr::Number(1.0), VectorMode::Complex),
        _ => Expr::Variable(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;

    fn parse_one(source: &str) -> Statement {
        let mut statements = parse_statements(source).unwrap();
        assert_eq!(statements.len(), 1);
        statements.remove(0)
    }

    #[test]
    fn test_parse_assignment() {
        let stmt = parse_one("A=(1,2)");
        assert_eq!(stmt.label.as_deref(), Some("A"));
        assert_eq!(
            stmt.expr,
            Expr::vector(Expr::Number(1.0), Expr::Number(2.0), VectorMode::Cartesian)
        );
    }

    #[test]
    fn test_parse_polar_vector() {
        let stmt = parse_one("P=(2;3)");
        match stmt.expr {
            Expr::Vector(v) => assert_eq!(v.mode, VectorMode::Polar),
            other => panic!("expected vector, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let stmt = parse_one("1+2*3");
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Number(7.0));
        let stmt = parse_one("2^3^2");
        // Right-associative exponentiation: 2^(3^2) = 512.
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Number(512.0));
        let stmt = parse_one("(1+2)*3");
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Number(9.0));
    }

    #[test]
    fn test_idents_stay_free_variables() {
        let stmt = parse_one("A+t");
        let vars = stmt.expr.collect_variables();
        assert!(vars.contains("A"));
        assert!(vars.contains("t"));
    }

    #[test]
    fn test_list_and_functions() {
        let stmt = parse_one("sqrt(4)+abs(-2)");
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Number(4.0));
        let stmt = parse_one("{1,2,3}");
        assert!(matches!(stmt.expr, Expr::List(ref items) if items.len() == 3));
    }

    #[test]
    fn test_command_desugar() {
        let stmt = parse_one("Midpoint(2,6)");
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Number(4.0));
        let stmt = parse_one("Distance(2,6)");
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Number(4.0));
        let err = parse_statements("Nonsense(1)").unwrap_err();
        assert!(matches!(err, FiguraError::Parse { .. }));
    }

    #[test]
    fn test_comparison_and_boolean() {
        let stmt = parse_one("1<2&&true");
        assert_eq!(stmt.expr.evaluate(&()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_multiple_statements() {
        let statements = parse_statements("a=1; b=2\nc=3").unwrap();
        assert_eq!(statements.len(), 3);
    }

    #[test]
    fn test_parse_error_reported() {
        let err = parse_statements("A=(1,").unwrap_err();
        assert!(matches!(err, FiguraError::Parse { .. }));
    }

    #[test]
    fn test_complex_unit() {
        let stmt = parse_one("i*i");
        let v = stmt.expr.evaluate(&()).unwrap();
        let vec = v.as_vec2().unwrap();
        assert_eq!(vec.x(), -1.0);
    }

    #[test]
    fn test_comment_and_blank_lines() {
        let statements = parse_statements("# heading\n\na=1\n# trailing\n").unwrap();
        assert_eq!(statements.len(), 1);
    }
}
