// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Traversal engine
//!
//! Generic pre-order rewriting over expression trees. A visitor that
//! returns a replacement for a node stops descent into that subtree; the
//! replacement is treated as final. Substitution visitors rely on this
//! short-circuit.

use super::{Expr, Value};
use crate::construction::GeoId;
use ahash::AHashSet;

/// Tree visitor. `process` returning `Some(replacement)` rewrites the
/// node and suppresses descent into it.
pub trait Traversing {
    fn process(&mut self, node: &Expr) -> Option<Expr>;
}

impl Expr {
    /// Pre-order traversal: visit this node, then (unless replaced)
    /// recurse into children. Returns whether this node itself was
    /// replaced; replacement is tracked explicitly rather than by
    /// identity comparison.
    pub fn traverse(&mut self, visitor: &mut dyn Traversing) -> bool {
        if let Some(replacement) = visitor.process(self) {
            *self = replacement;
            return true;
        }
        for child in self.children_mut() {
            child.traverse(visitor);
        }
        false
    }

    /// Read-only pre-order walk.
    pub fn for_each(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        for child in self.children() {
            child.for_each(f);
        }
    }

    /// Free function variables of this tree.
    pub fn collect_variables(&self) -> AHashSet<String> {
        let mut collector = VariableCollector::default();
        self.for_each(&mut |node| {
            collector.see(node);
        });
        collector.names
    }

    /// Construction objects referenced by this tree; these become the
    /// declared input set of the defining algorithm.
    pub fn collect_geos(&self) -> AHashSet<GeoId> {
        let mut collector = GeoCollector::default();
        self.for_each(&mut |node| {
            collector.see(node);
        });
        collector.ids
    }
}

/// Collects free function variable names. Stateless between nodes, so a
/// single instance may serve independent trees.
#[derive(Debug, Default)]
pub struct VariableCollector {
    pub names: AHashSet<String>,
}

impl VariableCollector {
    fn see(&mut self, node: &Expr) {
        if let Expr::Variable(name) = node {
            self.names.insert(name.clone());
        }
    }
}

impl Traversing for VariableCollector {
    fn process(&mut self, node: &Expr) -> Option<Expr> {
        self.see(node);
        None
    }
}

/// Collects geo-reference leaves for dependency-edge construction.
#[derive(Debug, Default)]
pub struct GeoCollector {
    pub ids: AHashSet<GeoId>,
}

impl GeoCollector {
    fn see(&mut self, node: &Expr) {
        if let Expr::Geo(id) = node {
            self.ids.insert(*id);
        }
    }
}

impl Traversing for GeoCollector {
    fn process(&mut self, node: &Expr) -> Option<Expr> {
        self.see(node);
        None
    }
}

/// Substitutes a free variable by an expression. Stateful: `replaced`
/// accumulates across trees until [`reset`](VariableReplacer::reset).
#[derive(Debug)]
pub struct VariableReplacer {
    name: String,
    replacement: Expr,
    replaced: usize,
}

impl VariableReplacer {
    pub fn new(name: impl Into<String>, replacement: Expr) -> Self {
        Self {
            name: name.into(),
            replacement,
            replaced: 0,
        }
    }

    pub fn replaced(&self) -> usize {
        self.replaced
    }

    pub fn reset(&mut self) {
        self.replaced = 0;
    }
}

impl Traversing for VariableReplacer {
    fn process(&mut self, node: &Expr) -> Option<Expr> {
        match node {
            Expr::Variable(name) if *name == self.name => {
                self.replaced += 1;
                Some(self.replacement.clone())
            }
            _ => None,
        }
    }
}

/// Rewrites references from one construction object to another, used
/// when a redefinition swaps an input.
#[derive(Debug)]
pub struct GeoReplacer {
    from: GeoId,
    to: GeoId,
}

impl GeoReplacer {
    pub fn new(from: GeoId, to: GeoId) -> Self {
        Self { from, to }
    }
}

impl Traversing for GeoReplacer {
    fn process(&mut self, node: &Expr) -> Option<Expr> {
        match node {
            Expr::Geo(id) if *id == self.from => Some(Expr::Geo(self.to)),
            _ => None,
        }
    }
}

/// Folds constant subtrees to their evaluated form. Composites only;
/// a fold that would produce an undefined value is skipped so the
/// original tree stays readable.
#[derive(Debug, Default)]
pub struct ConstantFolder;

impl Traversing for ConstantFolder {
    fn process(&mut self, node: &Expr) -> Option<Expr> {
        if node.is_leaf() || !node.is_constant() {
            return None;
        }
        match node.evaluate(&()) {
            Ok(value) if value.is_defined() && !matches!(value, Value::Symbolic(_)) => {
                Some(value.to_expr())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Op, VectorMode};

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    #[test]
    fn test_variable_collector() {
        let e = Expr::binary(
            Op::Add,
            Expr::Variable("t".into()),
            Expr::binary(Op::Mul, Expr::Variable("s".into()), Expr::Variable("t".into())),
        );
        let vars = e.collect_variables();
        assert_eq!(vars.len(), 2);
        assert!(vars.contains("t"));
        assert!(vars.contains("s"));
    }

    #[test]
    fn test_substitution_stops_descent() {
        // Replacing t by (t + 1) must not recurse into the replacement,
        // or it would loop forever.
        let mut e = Expr::binary(Op::Add, Expr::Variable("t".into()), num(2.0));
        let replacement = Expr::binary(Op::Add, Expr::Variable("t".into()), num(1.0));
        let mut replacer = VariableReplacer::new("t", replacement.clone());
        e.traverse(&mut replacer);
        assert_eq!(replacer.replaced(), 1);
        assert_eq!(e, Expr::binary(Op::Add, replacement, num(2.0)));
    }

    #[test]
    fn test_replacer_reset_contract() {
        let mut a = Expr::Variable("t".into());
        let mut b = Expr::Variable("t".into());
        let mut replacer = VariableReplacer::new("t", num(1.0));
        a.traverse(&mut replacer);
        b.traverse(&mut replacer);
        assert_eq!(replacer.replaced(), 2);
        replacer.reset();
        assert_eq!(replacer.replaced(), 0);
    }

    #[test]
    fn test_geo_replacer() {
        let from = GeoId::from_raw(1);
        let to = GeoId::from_raw(7);
        let mut e = Expr::binary(Op::Add, Expr::Geo(from), Expr::Geo(GeoId::from_raw(2)));
        e.traverse(&mut GeoReplacer::new(from, to));
        assert!(e.references(to));
        assert!(!e.references(from));
    }

    #[test]
    fn test_constant_folding() {
        let mut e = Expr::binary(
            Op::Add,
            Expr::Variable("t".into()),
            Expr::binary(Op::Mul, num(2.0), num(3.0)),
        );
        e.traverse(&mut ConstantFolder);
        assert_eq!(
            e,
            Expr::binary(Op::Add, Expr::Variable("t".into()), num(6.0))
        );
    }

    #[test]
    fn test_folding_skips_undefined() {
        let mut e = Expr::binary(Op::Div, num(1.0), num(0.0));
        e.traverse(&mut ConstantFolder);
        // Left intact rather than folded to an opaque NaN.
        assert_eq!(e, Expr::binary(Op::Div, num(1.0), num(0.0)));
    }

    #[test]
    fn test_fold_polar_vector() {
        let mut e = Expr::vector(num(1.0), num(0.0), VectorMode::Polar);
        e.traverse(&mut ConstantFolder);
        assert_eq!(
            e,
            Expr::vector(num(1.0), num(0.0), VectorMode::Cartesian)
        );
    }
}
