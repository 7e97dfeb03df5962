// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! The construction: object arena, dependency edges, recompute

use super::{AlgoId, Algorithm, GeoElement, GeoId, GeoState};
use crate::error::FiguraError;
use crate::expr::{evaluate, Expr, Resolver, Value};
use ahash::{AHashMap, AHashSet};

/// Change notification accumulated during a mutation and drained by the
/// kernel after commit, so listeners never observe a half-updated graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoEvent {
    Added(GeoId),
    Changed(GeoId),
    Removed(GeoId),
}

/// Per-construction auto-label source. Replaces global naming counters;
/// each construction names its own objects deterministically.
#[derive(Debug, Default)]
pub struct LabelContext {
    counter: u32,
}

impl LabelContext {
    fn spell(index: u32) -> String {
        let letter = (b'A' + (index % 26) as u8) as char;
        let round = index / 26;
        if round == 0 {
            letter.to_string()
        } else {
            format!("{}{}", letter, round)
        }
    }

    pub fn next_label(&mut self, taken: &AHashMap<String, GeoId>) -> String {
        loop {
            let label = Self::spell(self.counter);
            self.counter += 1;
            if !taken.contains_key(&label) {
                return label;
            }
        }
    }
}

/// The full set of named objects and their dependency graph for one
/// document/session. Single-threaded: all mutation happens on the one
/// logical evaluation thread.
#[derive(Debug, Default)]
pub struct Construction {
    geos: Vec<GeoElement>,
    algos: Vec<Option<Algorithm>>,
    labels: AHashMap<String, GeoId>,
    /// Construction order; survives redefinition.
    order: Vec<GeoId>,
    label_ctx: LabelContext,
    cascade_delete: bool,
    auto_recompute: bool,
    events: Vec<GeoEvent>,
    eval_counts: AHashMap<GeoId, u64>,
}

impl Construction {
    pub fn new() -> Self {
        Self {
            auto_recompute: true,
            ..Default::default()
        }
    }

    /// Cascading delete policy: off by default, deletion of a referenced
    /// object fails with `StillReferenced`.
    pub fn set_cascade_delete(&mut self, cascade: bool) {
        self.cascade_delete = cascade;
    }

    /// Eager (default) vs lazy recompute. When off, dependents stay
    /// `Invalidated` until [`recompute_invalidated`](Self::recompute_invalidated).
    pub fn set_auto_recompute(&mut self, auto: bool) {
        self.auto_recompute = auto;
    }

    // ---- lookup --------------------------------------------------------

    pub fn geo(&self, id: GeoId) -> Option<&GeoElement> {
        self.geos
            .get(id.index())
            .filter(|g| g.state != GeoState::Deleted)
    }

    fn geo_mut(&mut self, id: GeoId) -> Option<&mut GeoElement> {
        self.geos
            .get_mut(id.index())
            .filter(|g| g.state != GeoState::Deleted)
    }

    pub fn algorithm(&self, id: AlgoId) -> Option<&Algorithm> {
        self.algos.get(id.index()).and_then(Option::as_ref)
    }

    pub fn lookup(&self, label: &str) -> Option<GeoId> {
        self.labels.get(label).copied()
    }

    pub fn value(&self, id: GeoId) -> Value {
        self.geo(id).map(|g| g.value.clone()).unwrap_or(Value::Undefined)
    }

    /// Defining expression of a dependent object.
    pub fn definition_expr(&self, id: GeoId) -> Option<&Expr> {
        let algo = self.geo(id)?.algorithm?;
        self.algorithm(algo).map(Algorithm::expr)
    }

    /// Objects in construction order.
    pub fn objects(&self) -> impl Iterator<Item = &GeoElement> {
        self.order.iter().filter_map(|id| self.geo(*id))
    }

    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    /// Total number of dependency edges (algorithm input slots).
    pub fn edge_count(&self) -> usize {
        self.algos
            .iter()
            .flatten()
            .map(|a| a.inputs().len())
            .sum()
    }

    /// How often the defining algorithm of this object has run.
    pub fn evaluation_count(&self, id: GeoId) -> u64 {
        self.eval_counts.get(&id).copied().unwrap_or(0)
    }

    pub fn drain_events(&mut self) -> Vec<GeoEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- creation ------------------------------------------------------

    fn claim_label(&mut self, label: Option<String>) -> Result<String, FiguraError> {
        match label {
            Some(label) => {
                if self.labels.contains_key(&label) {
                    Err(FiguraError::DuplicateLabel { label })
                } else {
                    Ok(label)
                }
            }
            None => Ok(self.label_ctx.next_label(&self.labels)),
        }
    }

    /// Add a free object holding a direct value.
    pub fn add_free(&mut self, label: Option<String>, value: Value) -> Result<GeoId, FiguraError> {
        let label = self.claim_label(label)?;
        let id = GeoId::from_raw(self.geos.len() as u32);
        self.geos
            .push(GeoElement::new(id, label.clone(), value, GeoState::Free));
        self.labels.insert(label, id);
        self.order.push(id);
        self.events.push(GeoEvent::Added(id));
        Ok(id)
    }

    /// Add a dependent object defined by an expression. The declared
    /// input set is the expression's geo leaves; edges are registered
    /// before the first evaluation.
    pub fn add_dependent(
        &mut self,
        label: Option<String>,
        expr: Expr,
    ) -> Result<GeoId, FiguraError> {
        for input in expr.collect_geos() {
            if self.geo(input).is_none() {
                return Err(FiguraError::UnknownObject {
                    label: format!("#{}", input.index()),
                });
            }
        }
        let label = self.claim_label(label)?;
        let id = GeoId::from_raw(self.geos.len() as u32);
        self.geos.push(GeoElement::new(
            id,
            label.clone(),
            Value::Undefined,
            GeoState::Dependent,
        ));
        self.labels.insert(label, id);
        self.order.push(id);
        self.attach_algorithm(id, expr);
        self.compute_one(id);
        self.events.push(GeoEvent::Added(id));
        Ok(id)
    }

    fn attach_algorithm(&mut self, output: GeoId, expr: Expr) {
        let algo_id = AlgoId::from_raw(self.algos.len() as u32);
        let algo = Algorithm::new(algo_id, expr, output);
        for input in algo.inputs().to_vec() {
            if let Some(geo) = self.geo_mut(input) {
                geo.dependents.push(algo_id);
            }
        }
        self.algos.push(Some(algo));
        if let Some(geo) = self.geo_mut(output) {
            geo.algorithm = Some(algo_id);
        }
    }

    fn detach_algorithm(&mut self, output: GeoId) {
        let Some(algo_id) = self.geo(output).and_then(|g| g.algorithm) else {
            return;
        };
        if let Some(algo) = self.algos[algo_id.index()].take() {
            for input in algo.inputs() {
                if let Some(geo) = self.geos.get_mut(input.index()) {
                    geo.dependents.retain(|a| *a != algo_id);
                }
            }
        }
        if let Some(geo) = self.geo_mut(output) {
            geo.algorithm = None;
        }
    }

    // ---- redefinition --------------------------------------------------

    /// Replace an object's definition in place, keeping its identity,
    /// label, dependents and construction order.
    ///
    /// A definition that would close a dependency cycle is rejected
    /// atomically: the graph is untouched afterwards.
    pub fn redefine(&mut self, id: GeoId, expr: Expr) -> Result<(), FiguraError> {
        let label = match self.geo(id) {
            Some(geo) => geo.label.clone(),
            None => {
                return Err(FiguraError::UnknownObject {
                    label: format!("#{}", id.index()),
                })
            }
        };
        let inputs: Vec<GeoId> = expr.collect_geos().into_iter().collect();
        for input in &inputs {
            if self.geo(*input).is_none() {
                return Err(FiguraError::UnknownObject {
                    label: format!("#{}", input.index()),
                });
            }
        }
        // Cycle check happens before any mutation is committed.
        if self.would_close_cycle(id, &inputs) {
            return Err(FiguraError::CircularDefinition { label });
        }

        self.detach_algorithm(id);
        if inputs.is_empty() && !expr.contains_free_variable() {
            // Constant definition: the object becomes (or stays) free.
            let value = self.eval_logged(&expr, id);
            let geo = self.geo_mut(id).expect("checked above");
            geo.commit_value(value);
            geo.state = GeoState::Free;
            self.events.push(GeoEvent::Changed(id));
        } else {
            self.attach_algorithm(id, expr);
            if let Some(geo) = self.geo_mut(id) {
                geo.state = GeoState::Invalidated;
            }
            self.compute_one(id);
            self.events.push(GeoEvent::Changed(id));
        }
        self.invalidate_dependents(id);
        if self.auto_recompute {
            self.recompute_invalidated();
        }
        Ok(())
    }

    /// Move a free object to a new value (drag support). Returns whether
    /// the move applied; dependent objects cannot be moved directly.
    pub fn move_free(&mut self, id: GeoId, value: Value) -> bool {
        match self.geo_mut(id) {
            Some(geo) if geo.is_free() => {
                geo.commit_value(value);
            }
            _ => return false,
        }
        self.events.push(GeoEvent::Changed(id));
        self.invalidate_dependents(id);
        if self.auto_recompute {
            self.recompute_invalidated();
        }
        true
    }

    // ---- cycles --------------------------------------------------------

    /// Would defining `target` with the given inputs close a cycle?
    /// Walks defining algorithms from each input; acyclicity elsewhere is
    /// an invariant, so recompute never re-checks.
    fn would_close_cycle(&self, target: GeoId, inputs: &[GeoId]) -> bool {
        let mut stack: Vec<GeoId> = inputs.to_vec();
        let mut visited: AHashSet<GeoId> = AHashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(algo) = self.geo(current).and_then(|g| g.algorithm) {
                if let Some(algo) = self.algorithm(algo) {
                    stack.extend_from_slice(algo.inputs());
                }
            }
        }
        false
    }

    // ---- recompute -----------------------------------------------------

    /// Mark every transitive dependent of `id` as invalidated.
    fn invalidate_dependents(&mut self, id: GeoId) {
        let mut stack = vec![id];
        let mut visited: AHashSet<GeoId> = AHashSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let dependents = match self.geo(current) {
                Some(geo) => geo.dependents.clone(),
                None => continue,
            };
            for algo_id in dependents {
                if let Some(algo) = self.algorithm(algo_id) {
                    let output = algo.output();
                    if let Some(geo) = self.geo_mut(output) {
                        if geo.state == GeoState::Dependent {
                            geo.state = GeoState::Invalidated;
                        }
                        stack.push(output);
                    }
                }
            }
        }
    }

    /// Recompute the invalidated subgraph in dependency order. Each
    /// algorithm runs exactly once per pass even when its output is
    /// reachable along several paths; the pass assumes acyclicity.
    pub fn recompute_invalidated(&mut self) {
        let stale: Vec<GeoId> = self
            .order
            .iter()
            .copied()
            .filter(|id| matches!(self.geo(*id), Some(g) if g.state == GeoState::Invalidated))
            .collect();
        let mut done: AHashSet<GeoId> = AHashSet::new();
        for id in stale {
            self.compute_in_order(id, &mut done);
        }
    }

    /// Invalidate and recompute every dependent object.
    pub fn recompute_all(&mut self) {
        let all: Vec<GeoId> = self.order.clone();
        for id in &all {
            if let Some(geo) = self.geo_mut(*id) {
                if geo.state == GeoState::Dependent {
                    geo.state = GeoState::Invalidated;
                }
            }
        }
        self.recompute_invalidated();
    }

    /// Depth-first finish order: inputs first, then this node, each node
    /// at most once per pass via the `done` set.
    fn compute_in_order(&mut self, id: GeoId, done: &mut AHashSet<GeoId>) {
        if !done.insert(id) {
            return;
        }
        let inputs = match self.geo(id).and_then(|g| g.algorithm) {
            Some(algo_id) => self
                .algorithm(algo_id)
                .map(|a| a.inputs().to_vec())
                .unwrap_or_default(),
            None => return,
        };
        for input in inputs {
            if matches!(self.geo(input), Some(g) if g.state == GeoState::Invalidated) {
                self.compute_in_order(input, done);
            }
        }
        self.compute_one(id);
        self.events.push(GeoEvent::Changed(id));
    }

    /// Run one object's defining algorithm and commit the result.
    fn compute_one(&mut self, id: GeoId) {
        let Some(algo_id) = self.geo(id).and_then(|g| g.algorithm) else {
            return;
        };
        let value = {
            let this: &Construction = &*self;
            let Some(algo) = this.algorithm(algo_id) else {
                return;
            };
            this.eval_logged(algo.expr(), id)
        };
        *self.eval_counts.entry(id).or_insert(0) += 1;
        if let Some(geo) = self.geo_mut(id) {
            geo.commit_value(value);
            geo.state = GeoState::Dependent;
        }
    }

    /// Evaluation faults are programming errors: logged, fatal to this
    /// one evaluation only. The object goes undefined and the rest of
    /// the construction stays usable.
    fn eval_logged(&self, expr: &Expr, id: GeoId) -> Value {
        match evaluate(expr, self) {
            Ok(value) => value,
            Err(fault) => {
                log::error!("evaluation of object #{} failed: {}", id.index(), fault);
                Value::Undefined
            }
        }
    }

    // ---- deletion ------------------------------------------------------

    /// Outputs of algorithms consuming `id` (the objects that would
    /// dangle if `id` disappeared).
    fn dependent_outputs(&self, id: GeoId) -> Vec<GeoId> {
        let Some(geo) = self.geo(id) else {
            return Vec::new();
        };
        geo.dependents
            .iter()
            .filter_map(|a| self.algorithm(*a))
            .map(Algorithm::output)
            .filter(|out| self.geo(*out).is_some())
            .collect()
    }

    /// Delete an object. With dependents present this fails with
    /// `StillReferenced` unless cascading delete is enabled, in which
    /// case all transitive dependents are removed first (post-order),
    /// edges before objects.
    pub fn delete(&mut self, id: GeoId) -> Result<(), FiguraError> {
        let label = match self.geo(id) {
            Some(geo) => geo.label.clone(),
            None => {
                return Err(FiguraError::UnknownObject {
                    label: format!("#{}", id.index()),
                })
            }
        };
        let dependents = self.dependent_outputs(id);
        if !dependents.is_empty() {
            if !self.cascade_delete {
                let names = dependents
                    .iter()
                    .filter_map(|d| self.geo(*d))
                    .map(|g| g.label.clone())
                    .collect();
                return Err(FiguraError::StillReferenced {
                    label,
                    dependents: names,
                });
            }
            for dependent in dependents {
                // Re-check: an earlier cascade step may already have
                // removed this object.
                if self.geo(dependent).is_some() {
                    self.delete(dependent)?;
                }
            }
        }
        self.detach_algorithm(id);
        if let Some(geo) = self.geos.get_mut(id.index()) {
            geo.state = GeoState::Deleted;
        }
        self.labels.remove(&label);
        self.order.retain(|o| *o != id);
        self.events.push(GeoEvent::Removed(id));
        Ok(())
    }

    /// Inputs of an algorithm that are defined and carry a label, used
    /// by the undo store's working-set substitution.
    pub fn defined_and_labeled_inputs(&self, algo: AlgoId) -> Vec<GeoId> {
        self.algorithm(algo)
            .map(|a| {
                a.inputs()
                    .iter()
                    .copied()
                    .filter(|id| {
                        self.geo(*id)
                            .map(|g| g.value.is_defined() && !g.label.is_empty())
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mark UI-level move constraints on an object; consumed by the
    /// undo store's working-set substitution.
    pub fn set_constraints(
        &mut self,
        id: GeoId,
        on_path: bool,
        in_region: bool,
        changeable_parent: Option<GeoId>,
    ) {
        if let Some(geo) = self.geo_mut(id) {
            geo.on_path = on_path;
            geo.in_region = in_region;
            geo.changeable_parent = changeable_parent;
        }
    }
}

impl Resolver for Construction {
    fn resolve(&self, id: GeoId) -> Value {
        self.value(id)
    }
}
