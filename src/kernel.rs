// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Kernel API: the facade the presentation layer talks to

use crate::construction::{Construction, GeoEvent, GeoId};
use crate::error::FiguraError;
use crate::expr::{Expr, Traversing, Value};
use crate::io::{definition_string, parse_statements, Statement, StringTemplate};
use crate::undo::{UndoManager, UpdateActionStore};
use serde::Serialize;
use std::collections::VecDeque;

/// Callbacks the presentation layer registers to hear about committed
/// changes. Called only after a mutation is fully committed.
pub trait ConstructionListener {
    fn object_added(&mut self, cons: &Construction, id: GeoId);
    fn object_changed(&mut self, cons: &Construction, id: GeoId);
    fn object_removed(&mut self, cons: &Construction, id: GeoId);
}

/// Handle of a queued evaluation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

#[derive(Debug)]
struct PendingRequest {
    id: RequestId,
    text: String,
}

/// Resolves free variables to geo references where a label exists.
/// Runs as a traversal pass after parsing, before the statement applies.
struct LabelResolver<'a> {
    cons: &'a Construction,
}

impl Traversing for LabelResolver<'_> {
    fn process(&mut self, node: &Expr) -> Option<Expr> {
        match node {
            Expr::Variable(name) => self.cons.lookup(name).map(Expr::Geo),
            _ => None,
        }
    }
}

/// The single-threaded evaluation core: owns the construction, the undo
/// history, the listener registry and the FIFO request queue. All
/// mutation funnels through here; a request either completes or fails
/// atomically from the caller's perspective.
pub struct Kernel {
    construction: Construction,
    undo_manager: UndoManager,
    listeners: Vec<Box<dyn ConstructionListener>>,
    queue: VecDeque<PendingRequest>,
    next_request: u64,
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            construction: Construction::new(),
            undo_manager: UndoManager::new(),
            listeners: Vec::new(),
            queue: VecDeque::new(),
            next_request: 0,
        }
    }

    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    pub fn construction_mut(&mut self) -> &mut Construction {
        &mut self.construction
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo_manager
    }

    pub fn undo_manager_mut(&mut self) -> &mut UndoManager {
        &mut self.undo_manager
    }

    /// Split borrow for callers driving an [`UpdateActionStore`] against
    /// the construction and undo manager at once.
    pub fn undo_parts(&mut self) -> (&Construction, &mut UndoManager) {
        (&self.construction, &mut self.undo_manager)
    }

    pub fn add_listener(&mut self, listener: Box<dyn ConstructionListener>) {
        self.listeners.push(listener);
    }

    // ---- textual input -------------------------------------------------

    /// Parse and apply a script. The whole text must parse before
    /// anything applies; each statement then commits atomically, and a
    /// failing statement stops the script with earlier statements kept.
    ///
    /// Returns the objects created or redefined, in statement order.
    pub fn parse_and_evaluate(&mut self, text: &str) -> Result<Vec<GeoId>, FiguraError> {
        let statements = parse_statements(text)?;
        let mut touched = Vec::with_capacity(statements.len());
        for statement in statements {
            let result = self.apply_statement(statement);
            self.dispatch_events();
            touched.push(result?);
        }
        Ok(touched)
    }

    fn apply_statement(&mut self, statement: Statement) -> Result<GeoId, FiguraError> {
        let Statement { label, mut expr } = statement;
        expr.traverse(&mut LabelResolver {
            cons: &self.construction,
        });

        if let Some(label) = &label {
            if let Some(id) = self.construction.lookup(label) {
                self.construction.redefine(id, expr)?;
                return Ok(id);
            }
        }

        if expr.collect_geos().is_empty() && !expr.contains_free_variable() {
            // Constant definition: a free object holding the folded value.
            let value = expr.evaluate(&self.construction).unwrap_or(Value::Undefined);
            self.construction.add_free(label, value)
        } else {
            self.construction.add_dependent(label, expr)
        }
    }

    // ---- object access -------------------------------------------------

    pub fn lookup(&self, label: &str) -> Option<GeoId> {
        self.construction.lookup(label)
    }

    pub fn value(&self, id: GeoId) -> Value {
        self.construction.value(id)
    }

    /// Textual definition in the requested template syntax.
    pub fn definition(&self, id: GeoId, template: &StringTemplate) -> Option<String> {
        definition_string(id, template, &self.construction)
    }

    /// Drag support: move a free object and recompute dependents.
    pub fn move_free(&mut self, id: GeoId, value: Value) -> bool {
        let moved = self.construction.move_free(id, value);
        self.dispatch_events();
        moved
    }

    pub fn delete(&mut self, id: GeoId) -> Result<(), FiguraError> {
        let result = self.construction.delete(id);
        self.dispatch_events();
        result
    }

    // ---- undo/redo -----------------------------------------------------

    /// Commit an interactive edit's working set as one undo action.
    /// Returns `true` iff nothing was tracked (no-op edit).
    pub fn store_undo(&mut self, store: &mut UpdateActionStore) -> bool {
        store.store_undo(&self.construction, &mut self.undo_manager)
    }

    /// Apply the newest undo action: every touched object is restored to
    /// its previous definition.
    pub fn undo(&mut self) -> bool {
        let Some(action) = self.undo_manager.pop_undo() else {
            return false;
        };
        self.apply_contents(&action.undo_contents);
        true
    }

    /// Re-apply the newest undone action.
    pub fn redo(&mut self) -> bool {
        let Some(action) = self.undo_manager.pop_redo() else {
            return false;
        };
        self.apply_contents(&action.contents);
        true
    }

    fn apply_contents(&mut self, contents: &[String]) {
        for content in contents {
            match parse_statements(content) {
                Ok(statements) => {
                    for statement in statements {
                        if let Err(err) = self.apply_statement(statement) {
                            log::error!("undo content '{}' failed to apply: {}", content, err);
                        }
                    }
                }
                Err(err) => log::error!("undo content '{}' failed to parse: {}", content, err),
            }
        }
        self.dispatch_events();
    }

    // ---- request queue -------------------------------------------------

    /// Queue a script for evaluation on the evaluation thread. Requests
    /// run FIFO; a later request always observes earlier results.
    pub fn enqueue(&mut self, text: impl Into<String>) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.queue.push_back(PendingRequest {
            id,
            text: text.into(),
        });
        id
    }

    /// Advisory cancellation: drops the request if it has not started.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|req| req.id != id);
        let dropped = self.queue.len() < before;
        if dropped {
            log::debug!("dropped pending request {:?}", id);
        }
        dropped
    }

    /// Drain the queue in order. Each request runs to completion; its
    /// outcome is reported alongside its id.
    pub fn process_pending(&mut self) -> Vec<(RequestId, Result<Vec<GeoId>, FiguraError>)> {
        let mut results = Vec::with_capacity(self.queue.len());
        while let Some(request) = self.queue.pop_front() {
            let outcome = self.parse_and_evaluate(&request.text);
            results.push((request.id, outcome));
        }
        results
    }

    // ---- events --------------------------------------------------------

    fn dispatch_events(&mut self) {
        let events = self.construction.drain_events();
        if events.is_empty() || self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        for event in &events {
            for listener in listeners.iter_mut() {
                match event {
                    GeoEvent::Added(id) => listener.object_added(&self.construction, *id),
                    GeoEvent::Changed(id) => listener.object_changed(&self.construction, *id),
                    GeoEvent::Removed(id) => listener.object_removed(&self.construction, *id),
                }
            }
        }
        self.listeners = listeners;
    }

    // ---- export --------------------------------------------------------

    /// Serialize the construction in document order.
    pub fn export_json(&self) -> anyhow::Result<String> {
        let tpl = StringTemplate::export();
        let objects: Vec<DocumentObject> = self
            .construction
            .objects()
            .map(|geo| DocumentObject {
                label: geo.label().to_string(),
                kind: geo.kind().as_str(),
                state: geo.state().as_str(),
                definition: definition_string(geo.id(), &tpl, &self.construction)
                    .unwrap_or_default(),
                value: crate::io::value_string(geo.value(), &tpl, &self.construction),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&Document { objects })?)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct Document<'a> {
    objects: Vec<DocumentObject<'a>>,
}

#[derive(Serialize)]
struct DocumentObject<'a> {
    label: String,
    kind: &'a str,
    state: &'a str,
    definition: String,
    value: String,
}
