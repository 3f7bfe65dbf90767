//! Aggregate conflict reporting

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::conflict::{ConflictType, Severity};

/// Inclusive time window (Unix ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub const fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Restricts which audit rows an analytics query aggregates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsFilter {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

impl AnalyticsFilter {
    #[must_use]
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: Some(workspace_id.into()),
            time_range: None,
        }
    }

    #[must_use]
    pub const fn with_time_range(mut self, start: i64, end: i64) -> Self {
        self.time_range = Some(TimeRange { start, end });
        self
    }
}

/// Conflicts detected and resolved on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub conflicts: usize,
    pub resolved: usize,
}

/// Point-in-time aggregate over the audit log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictAnalytics {
    pub total_conflicts: usize,
    pub conflicts_by_type: BTreeMap<ConflictType, usize>,
    pub conflicts_by_severity: BTreeMap<Severity, usize>,
    /// Mean over successful resolutions (ms)
    pub average_resolution_time_ms: f64,
    pub resolution_success_rate: f64,
    pub automatic_resolution_rate: f64,
    /// Distinct conflicts each user's operations were involved in
    pub user_participation: BTreeMap<String, usize>,
    /// UTC hour of detection → conflicts
    pub peak_hours: BTreeMap<u32, usize>,
    /// Last 30 days, oldest first
    pub daily_trend: Vec<DailyTrend>,
}

impl ConflictAnalytics {
    /// Hour with the most detected conflicts, earliest hour on ties
    pub fn busiest_hour(&self) -> Option<u32> {
        self.peak_hours
            .iter()
            .max_by(|(hour_a, count_a), (hour_b, count_b)| {
                count_a.cmp(count_b).then(hour_b.cmp(hour_a))
            })
            .map(|(hour, _)| *hour)
    }
}
