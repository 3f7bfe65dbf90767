//! Append-only conflict audit trail

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::conflict::{Conflict, ConflictId, ConflictType, Severity};
use super::operation::Operation;
use super::strategy::ResolutionStrategy;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ConflictDetected,
    ResolutionAttempted,
    ResolutionSucceeded,
    ResolutionFailed,
    ManualIntervention,
}

impl AuditAction {
    pub const ALL: [Self; 5] = [
        Self::ConflictDetected,
        Self::ResolutionAttempted,
        Self::ResolutionSucceeded,
        Self::ResolutionFailed,
        Self::ManualIntervention,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConflictDetected => "conflict_detected",
            Self::ResolutionAttempted => "resolution_attempted",
            Self::ResolutionSucceeded => "resolution_succeeded",
            Self::ResolutionFailed => "resolution_failed",
            Self::ManualIntervention => "manual_intervention",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown audit action: {s}")))
    }
}

/// Decision context captured with every audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDetails {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub severity: Severity,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ResolutionStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AuditDetails {
    /// Snapshot the classification and operations of `conflict`
    #[must_use]
    pub fn for_conflict(conflict: &Conflict) -> Self {
        Self {
            conflict_type: conflict.conflict_type,
            severity: conflict.severity,
            operations: conflict.operations.clone(),
            strategy: conflict.resolution_strategy,
            resolution_time_ms: conflict.resolution_time_ms,
            error: None,
            confidence: None,
        }
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Who and where a resolution request came from, plus ambient client
/// metrics supplied by the transform layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionContext {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Client metadata (user agent, address, performance metrics, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ResolutionContext {
    #[must_use]
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: Some(workspace_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// One immutable row of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictAuditEntry {
    pub id: String,
    pub conflict_id: ConflictId,
    pub workspace_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub action: AuditAction,
    pub details: AuditDetails,
    /// Entry timestamp (Unix ms)
    pub timestamp: i64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ConflictAuditEntry {
    #[must_use]
    pub fn new(
        conflict_id: ConflictId,
        context: &ResolutionContext,
        action: AuditAction,
        details: AuditDetails,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            conflict_id,
            workspace_id: context.workspace_id.clone(),
            session_id: context.session_id.clone(),
            user_id: context.user_id.clone(),
            action,
            details,
            timestamp,
            metadata: context.metadata.clone(),
        }
    }
}
