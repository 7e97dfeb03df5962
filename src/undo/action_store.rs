// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Working set of objects touched by an in-progress interactive edit

use super::{ActionKind, MoveMode, UndoItem, UndoManager};
use crate::construction::{Construction, GeoId};

/// Accumulates `(object, move mode)` pairs across one interactive edit
/// (a drag, say) and commits them as a single reversible action.
/// Previous contents are captured when an item enters the set, before
/// any mutation happens.
#[derive(Debug, Default)]
pub struct UpdateActionStore {
    items: Vec<UndoItem>,
}

impl UpdateActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the working set with the given objects.
    pub fn store(&mut self, cons: &Construction, geos: &[GeoId], move_mode: MoveMode) {
        self.clear();
        for geo in geos {
            self.add_if_not_present(cons, *geo, move_mode);
        }
    }

    /// Track the current selection if nothing is tracked yet. Objects
    /// with unusual dependency surfaces are substituted so undo restores
    /// the construction rather than a derived artifact.
    pub fn store_selection(&mut self, cons: &Construction, selection: &[GeoId], move_mode: MoveMode) {
        if self.items.is_empty() {
            let expanded = Self::geos_to_store(cons, selection);
            self.store(cons, &expanded, move_mode);
        }
    }

    /// Expansion rule for a selection:
    /// - an object dragged through a changeable parent surface
    ///   contributes that surface instead;
    /// - a dependent object that is not constrained onto a path or into
    ///   a region contributes its algorithm's defined and labeled
    ///   inputs, then itself;
    /// - everything else contributes just itself.
    fn geos_to_store(cons: &Construction, selection: &[GeoId]) -> Vec<GeoId> {
        let mut out = Vec::new();
        for id in selection {
            let Some(geo) = cons.geo(*id) else {
                continue;
            };
            if let Some(surface) = geo.changeable_parent {
                out.push(surface);
                continue;
            }
            if let Some(algo) = geo.parent_algorithm() {
                if !geo.on_path && !geo.in_region {
                    out.extend(cons.defined_and_labeled_inputs(algo));
                }
            }
            out.push(*id);
        }
        out
    }

    /// Add a single object unless already tracked (dedup by identity).
    pub fn add_if_not_present(&mut self, cons: &Construction, geo: GeoId, move_mode: MoveMode) {
        if self.items.iter().any(|item| item.has_geo(geo)) {
            return;
        }
        if let Some(item) = UndoItem::capture(cons, geo, move_mode) {
            self.items.push(item);
        }
    }

    /// Drop all items tracking the given object.
    pub fn remove(&mut self, geo: GeoId) {
        self.items.retain(|item| !item.has_geo(geo));
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Commit the working set to the undo manager as one action: the
    /// ordered triple (new contents, previous contents, labels).
    pub fn store_update_action(&mut self, cons: &Construction, undo: &mut UndoManager) {
        let mut contents = Vec::with_capacity(self.items.len());
        let mut undo_contents = Vec::with_capacity(self.items.len());
        let mut labels = Vec::with_capacity(self.items.len());
        for item in &self.items {
            contents.push(item.content(cons));
            undo_contents.push(item.previous_content().to_string());
            labels.push(item.label().to_string());
        }
        undo.build_action(ActionKind::Update, contents)
            .with_undo(ActionKind::Update, undo_contents)
            .with_labels(labels)
            .store_and_notify_unsaved();
    }

    /// Commit if anything is tracked. Returns `true` iff the set was
    /// empty, letting callers skip an undo step for a no-op edit.
    pub fn store_undo(&mut self, cons: &Construction, undo: &mut UndoManager) -> bool {
        if !self.items.is_empty() {
            self.store_update_action(cons, undo);
        }
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, Op, Value, Vec2, VectorMode};

    fn point(x: f64, y: f64) -> Value {
        Value::Vec2(Vec2::new(x, y, VectorMode::Cartesian))
    }

    #[test]
    fn test_store_undo_round_trip() {
        let mut cons = Construction::new();
        let a = cons.add_free(Some("A".into()), point(1.0, 1.0)).unwrap();
        let mut store = UpdateActionStore::new();
        let mut manager = UndoManager::new();

        store.store(&cons, &[a], MoveMode::Drag);
        cons.move_free(a, point(2.0, 3.0));
        assert!(!store.store_undo(&cons, &mut manager));

        let action = manager.pop_undo().unwrap();
        assert_eq!(action.contents, vec!["A=(2,3)".to_string()]);
        assert_eq!(action.undo_contents, vec!["A=(1,1)".to_string()]);
        assert_eq!(action.labels, vec!["A".to_string()]);
    }

    #[test]
    fn test_store_undo_reports_noop() {
        let cons = Construction::new();
        let mut store = UpdateActionStore::new();
        let mut manager = UndoManager::new();
        assert!(store.store_undo(&cons, &mut manager));
        assert!(!manager.can_undo());
    }

    #[test]
    fn test_dedup_by_identity() {
        let mut cons = Construction::new();
        let a = cons.add_free(Some("A".into()), point(0.0, 0.0)).unwrap();
        let mut store = UpdateActionStore::new();
        store.add_if_not_present(&cons, a, MoveMode::Drag);
        store.add_if_not_present(&cons, a, MoveMode::Drag);
        cons.move_free(a, point(1.0, 0.0));
        let mut manager = UndoManager::new();
        store.store_update_action(&cons, &mut manager);
        let action = manager.pop_undo().unwrap();
        assert_eq!(action.labels.len(), 1);
    }

    #[test]
    fn test_selection_expands_to_parent_inputs() {
        let mut cons = Construction::new();
        let a = cons.add_free(Some("A".into()), point(0.0, 0.0)).unwrap();
        let b = cons.add_free(Some("B".into()), point(2.0, 2.0)).unwrap();
        let m = cons
            .add_dependent(
                Some("M".into()),
                Expr::binary(
                    Op::Div,
                    Expr::binary(Op::Add, Expr::Geo(a), Expr::Geo(b)),
                    Expr::Number(2.0),
                ),
            )
            .unwrap();

        let mut store = UpdateActionStore::new();
        let mut manager = UndoManager::new();
        store.store_selection(&cons, &[m], MoveMode::Drag);
        store.store_update_action(&cons, &mut manager);
        let action = manager.pop_undo().unwrap();
        // The midpoint's defining inputs come along, then the point.
        assert_eq!(action.labels, vec!["A".to_string(), "B".to_string(), "M".to_string()]);
    }

    #[test]
    fn test_point_on_path_not_expanded() {
        let mut cons = Construction::new();
        let a = cons.add_free(Some("A".into()), point(0.0, 0.0)).unwrap();
        let p = cons
            .add_dependent(
                Some("P".into()),
                Expr::binary(
                    Op::Add,
                    Expr::Geo(a),
                    Expr::vector(Expr::Number(1.0), Expr::Number(0.0), VectorMode::Cartesian),
                ),
            )
            .unwrap();
        cons.set_constraints(p, true, false, None);

        let mut store = UpdateActionStore::new();
        let mut manager = UndoManager::new();
        store.store_selection(&cons, &[p], MoveMode::Drag);
        store.store_update_action(&cons, &mut manager);
        let action = manager.pop_undo().unwrap();
        assert_eq!(action.labels, vec!["P".to_string()]);
    }

    #[test]
    fn test_changeable_parent_substitution() {
        let mut cons = Construction::new();
        let surface = cons.add_free(Some("S".into()), point(0.0, 0.0)).unwrap();
        let handle = cons.add_free(Some("H".into()), point(1.0, 1.0)).unwrap();
        cons.set_constraints(handle, false, false, Some(surface));

        let mut store = UpdateActionStore::new();
        let mut manager = UndoManager::new();
        store.store_selection(&cons, &[handle], MoveMode::Drag);
        store.store_update_action(&cons, &mut manager);
        let action = manager.pop_undo().unwrap();
        assert_eq!(action.labels, vec!["S".to_string()]);
    }
}
