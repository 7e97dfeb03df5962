// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Undo item: one object's snapshot pair

use crate::construction::{Construction, GeoId};
use crate::io::{definition_string, StringTemplate};

/// Interactive edit mode that produced the tracked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    None,
    Drag,
    Translate,
    Rotate,
}

/// Snapshot of one object taken at edit start. The previous content is
/// captured immediately, before any mutation, so the eventual undo
/// step restores the true pre-edit definition.
#[derive(Debug, Clone)]
pub struct UndoItem {
    geo: GeoId,
    move_mode: MoveMode,
    label: String,
    previous: String,
}

impl UndoItem {
    pub fn capture(cons: &Construction, geo: GeoId, move_mode: MoveMode) -> Option<Self> {
        let label = cons.geo(geo)?.label().to_string();
        let previous = definition_string(geo, &StringTemplate::edit(), cons)?;
        Some(Self {
            geo,
            move_mode,
            label,
            previous,
        })
    }

    pub fn has_geo(&self, geo: GeoId) -> bool {
        self.geo == geo
    }

    pub fn geo(&self) -> GeoId {
        self.geo
    }

    pub fn move_mode(&self) -> MoveMode {
        self.move_mode
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current definition, read at commit time.
    pub fn content(&self, cons: &Construction) -> String {
        definition_string(self.geo, &StringTemplate::edit(), cons)
            .unwrap_or_else(|| self.previous.clone())
    }

    /// Pre-edit definition, captured at creation.
    pub fn previous_content(&self) -> &str {
        &self.previous
    }
}
