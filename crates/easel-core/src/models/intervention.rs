//! Manual intervention requests

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::conflict::ConflictId;
use super::recommendation::ResolutionRecommendation;
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionStatus {
    #[default]
    Pending,
    Resolved,
    Expired,
}

impl InterventionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for InterventionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterventionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "expired" => Ok(Self::Expired),
            other => Err(Error::InvalidInput(format!(
                "unknown intervention status: {other}"
            ))),
        }
    }
}

/// Persisted request for a human decision on a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualInterventionRecord {
    pub id: String,
    pub conflict_id: ConflictId,
    pub recommendation: Option<ResolutionRecommendation>,
    pub status: InterventionStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl ManualInterventionRecord {
    #[must_use]
    pub fn pending(
        conflict_id: ConflictId,
        recommendation: Option<ResolutionRecommendation>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            conflict_id,
            recommendation,
            status: InterventionStatus::Pending,
            created_at,
        }
    }
}
