//! Conflict model

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::operation::{Bounds, Operation};
use super::strategy::ResolutionStrategy;
use crate::error::Error;

/// A unique identifier for a conflict, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictId(Uuid);

impl ConflictId {
    /// Create a new unique conflict ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConflictId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Classification assigned by the upstream detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    Spatial,
    Temporal,
    Semantic,
    Ordering,
    Dependency,
    Compound,
}

impl ConflictType {
    pub const ALL: [Self; 6] = [
        Self::Spatial,
        Self::Temporal,
        Self::Semantic,
        Self::Ordering,
        Self::Dependency,
        Self::Compound,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spatial => "spatial",
            Self::Temporal => "temporal",
            Self::Semantic => "semantic",
            Self::Ordering => "ordering",
            Self::Dependency => "dependency",
            Self::Compound => "compound",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown conflict type: {s}")))
    }
}

/// Qualitative impact ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown severity: {s}")))
    }
}

/// Overlap metadata for spatial conflicts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialOverlap {
    /// Fraction of the contested area that overlaps, in `[0, 1]`
    pub percentage: f64,
    /// Overlapping region, when the detector reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Bounds>,
}

/// Incompatibility metadata for semantic conflicts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticConflict {
    #[serde(default)]
    pub incompatible_changes: Vec<String>,
}

/// Outcome recorded on a resolved conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub strategy: ResolutionStrategy,
    pub result_operation: Operation,
    pub confidence: f64,
    pub manual_intervention_required: bool,
}

/// Where a tracked conflict sits in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    #[default]
    Detected,
    Analyzing,
    Resolving,
    Resolved,
    ManualPending,
    Expired,
}

impl ConflictStatus {
    /// Resolved and expired conflicts never change again
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Expired)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::Analyzing => "analyzing",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::ManualPending => "manual_pending",
            Self::Expired => "expired",
        }
    }
}

/// A detected set of operations that cannot all be applied without
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Unique identifier
    #[serde(default)]
    pub id: ConflictId,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub severity: Severity,
    /// Involved operations in detection order; never empty once accepted
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_overlap: Option<SpatialOverlap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_conflict: Option<SemanticConflict>,
    /// Detection timestamp (Unix ms)
    pub detected_at: i64,
    /// Resolution timestamp (Unix ms)
    #[serde(default)]
    pub resolved_at: Option<i64>,
    #[serde(default)]
    pub resolution_strategy: Option<ResolutionStrategy>,
    /// Time spent resolving (ms)
    #[serde(default)]
    pub resolution_time_ms: Option<i64>,
    #[serde(default)]
    pub resolution: Option<ConflictResolution>,
}

impl Conflict {
    /// Create a conflict detected at `detected_at`
    #[must_use]
    pub fn new(
        conflict_type: ConflictType,
        severity: Severity,
        operations: Vec<Operation>,
        detected_at: i64,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            conflict_type,
            severity,
            operations,
            spatial_overlap: None,
            semantic_conflict: None,
            detected_at,
            resolved_at: None,
            resolution_strategy: None,
            resolution_time_ms: None,
            resolution: None,
        }
    }

    #[must_use]
    pub fn with_spatial_overlap(mut self, percentage: f64) -> Self {
        self.spatial_overlap = Some(SpatialOverlap {
            percentage,
            region: None,
        });
        self
    }

    #[must_use]
    pub fn with_incompatible_changes<I, S>(mut self, changes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.semantic_conflict = Some(SemanticConflict {
            incompatible_changes: changes.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub const fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Distinct authors across the involved operations, in first-seen order
    #[must_use]
    pub fn affected_users(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.operations
            .iter()
            .filter(|op| seen.insert(op.user_id.as_str()))
            .map(|op| op.user_id.clone())
            .collect()
    }
}
