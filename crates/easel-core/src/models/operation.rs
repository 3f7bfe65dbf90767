//! Canvas operation model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for an operation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Create a new unique operation ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// What an operation does to the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    #[default]
    Move,
    Style,
    Delete,
}

/// Axis-aligned rectangle in canvas coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An atomic, timestamped edit submitted by one user.
///
/// Operations are owned by the transport layer; conflicts hold copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier
    #[serde(default)]
    pub id: OperationId,
    /// Authoring user
    pub user_id: String,
    /// Submission timestamp (Unix ms)
    pub timestamp: i64,
    /// Edit kind
    #[serde(default)]
    pub kind: OperationKind,
    /// Geometry touched by the edit, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Free-form element data
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Free-form element style
    #[serde(default)]
    pub style: Map<String, Value>,
}

impl Operation {
    /// Create an empty operation authored by `user_id` at `timestamp`
    #[must_use]
    pub fn new(user_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: OperationId::new(),
            user_id: user_id.into(),
            timestamp,
            kind: OperationKind::default(),
            bounds: None,
            data: Map::new(),
            style: Map::new(),
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Set a single `data` field
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Set a single `style` field
    #[must_use]
    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_id_parse() {
        let id = OperationId::new();
        let parsed: OperationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn operation_deserializes_with_defaults() {
        let op: Operation =
            serde_json::from_str(r#"{"user_id":"alice","timestamp":42,"data":{"x":1}}"#).unwrap();
        assert_eq!(op.user_id, "alice");
        assert_eq!(op.kind, OperationKind::Move);
        assert_eq!(op.data.get("x"), Some(&Value::from(1)));
        assert!(op.style.is_empty());
        assert!(op.bounds.is_none());
    }
}
