// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Construction object definitions

use crate::construction::AlgoId;
use crate::expr::Value;
use serde::{Deserialize, Serialize};

/// Handle of a construction object. Expression leaves hold these instead
/// of owning pointers; the arena inside [`Construction`](super::Construction)
/// owns every object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GeoId(u32);

impl GeoId {
    pub fn from_raw(raw: u32) -> Self {
        GeoId(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lifecycle state of a construction object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoState {
    /// No defining algorithm; value set directly by the user.
    Free,
    /// Value computed by a defining algorithm from other objects.
    Dependent,
    /// A transitive input changed; value is stale until recompute.
    Invalidated,
    /// Removed from the construction; the arena slot is retired.
    Deleted,
}

impl GeoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoState::Free => "free",
            GeoState::Dependent => "dependent",
            GeoState::Invalidated => "invalidated",
            GeoState::Deleted => "deleted",
        }
    }
}

/// Coarse classification of an object, derived from its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoKind {
    Numeric,
    Boolean,
    Point,
    List,
    Undefined,
}

impl GeoKind {
    pub fn of(value: &Value) -> GeoKind {
        match value {
            Value::Number(_) => GeoKind::Numeric,
            Value::Bool(_) => GeoKind::Boolean,
            Value::Vec2(_) => GeoKind::Point,
            Value::List(_) => GeoKind::List,
            Value::Symbolic(_) | Value::Undefined => GeoKind::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeoKind::Numeric => "number",
            GeoKind::Boolean => "boolean",
            GeoKind::Point => "point",
            GeoKind::List => "list",
            GeoKind::Undefined => "undefined",
        }
    }
}

/// A named construction object living in the arena.
#[derive(Debug, Clone)]
pub struct GeoElement {
    pub(crate) id: GeoId,
    pub(crate) label: String,
    pub(crate) value: Value,
    pub(crate) state: GeoState,
    /// Defining algorithm; `None` for free objects.
    pub(crate) algorithm: Option<AlgoId>,
    /// Algorithms consuming this object as input.
    pub(crate) dependents: Vec<AlgoId>,
    pub(crate) kind: GeoKind,
    pub visible: bool,
    pub label_visible: bool,
    /// Point constrained onto a path: moves along the path, so the undo
    /// store tracks the point itself, not its parent's inputs.
    pub on_path: bool,
    /// Point constrained into a region; same undo treatment as `on_path`.
    pub in_region: bool,
    /// Surface whose definition actually changes when this object is
    /// dragged; the undo store substitutes it for this object.
    pub changeable_parent: Option<GeoId>,
}

impl GeoElement {
    pub(crate) fn new(id: GeoId, label: String, value: Value, state: GeoState) -> Self {
        let kind = GeoKind::of(&value);
        Self {
            id,
            label,
            value,
            state,
            algorithm: None,
            dependents: Vec::new(),
            kind,
            visible: true,
            label_visible: true,
            on_path: false,
            in_region: false,
            changeable_parent: None,
        }
    }

    pub fn id(&self) -> GeoId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn state(&self) -> GeoState {
        self.state
    }

    pub fn kind(&self) -> GeoKind {
        self.kind
    }

    pub fn is_free(&self) -> bool {
        self.algorithm.is_none() && self.state != GeoState::Deleted
    }

    pub fn is_dependent(&self) -> bool {
        self.algorithm.is_some()
    }

    pub fn parent_algorithm(&self) -> Option<AlgoId> {
        self.algorithm
    }

    pub(crate) fn commit_value(&mut self, value: Value) {
        self.kind = GeoKind::of(&value);
        self.value = value;
    }
}
