//! Conflict analytics over the audit log

#![allow(clippy::cast_precision_loss)] // counts are far below f64 precision

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Timelike};

use crate::clock::Clock;
use crate::db::{AuditQuery, ConflictStore};
use crate::error::{Error, Result};
use crate::models::{
    AnalyticsFilter, AuditAction, ConflictAnalytics, ConflictAuditEntry, ConflictId,
    ConflictType, DailyTrend, ResolutionStrategy, Severity,
};

const TREND_DAYS: u64 = 30;

#[derive(Debug)]
struct ConflictSummary {
    detected_at: i64,
    conflict_type: ConflictType,
    severity: Severity,
    resolved_at: Option<i64>,
    strategy: Option<ResolutionStrategy>,
    users: HashSet<String>,
}

/// Aggregate `entries` matching `filter`, grouping them by conflict.
///
/// `now_ms` anchors the 30-day daily trend.
pub fn compute(
    entries: &[ConflictAuditEntry],
    filter: &AnalyticsFilter,
    now_ms: i64,
) -> ConflictAnalytics {
    let mut order: Vec<ConflictId> = Vec::new();
    let mut summaries: HashMap<ConflictId, ConflictSummary> = HashMap::new();
    let mut resolution_times = Vec::new();

    let matching = entries.iter().filter(|entry| {
        filter
            .workspace_id
            .as_ref()
            .is_none_or(|workspace| entry.workspace_id.as_ref() == Some(workspace))
            && filter
                .time_range
                .is_none_or(|range| range.contains(entry.timestamp))
    });

    for entry in matching {
        let summary = summaries.entry(entry.conflict_id).or_insert_with(|| {
            order.push(entry.conflict_id);
            ConflictSummary {
                detected_at: entry.timestamp,
                conflict_type: entry.details.conflict_type,
                severity: entry.details.severity,
                resolved_at: None,
                strategy: None,
                users: HashSet::new(),
            }
        });

        summary.detected_at = summary.detected_at.min(entry.timestamp);
        if entry.details.strategy.is_some() {
            summary.strategy = entry.details.strategy;
        }
        summary.users.extend(
            entry
                .details
                .operations
                .iter()
                .map(|operation| operation.user_id.clone()),
        );

        if entry.action == AuditAction::ResolutionSucceeded {
            summary.resolved_at.get_or_insert(entry.timestamp);
            if let Some(elapsed) = entry.details.resolution_time_ms {
                resolution_times.push(elapsed);
            }
        }
    }

    let total = order.len();
    let mut analytics = ConflictAnalytics {
        total_conflicts: total,
        daily_trend: empty_trend(now_ms),
        ..ConflictAnalytics::default()
    };

    let mut succeeded = 0usize;
    let mut automatic = 0usize;
    for summary in order.iter().filter_map(|id| summaries.get(id)) {
        *analytics
            .conflicts_by_type
            .entry(summary.conflict_type)
            .or_default() += 1;
        *analytics
            .conflicts_by_severity
            .entry(summary.severity)
            .or_default() += 1;
        for user in &summary.users {
            *analytics
                .user_participation
                .entry(user.clone())
                .or_default() += 1;
        }
        if let Some(hour) = utc_hour(summary.detected_at) {
            *analytics.peak_hours.entry(hour).or_default() += 1;
        }
        if summary.resolved_at.is_some() {
            succeeded += 1;
        }
        if summary.strategy.is_some_and(|strategy| !strategy.is_manual()) {
            automatic += 1;
        }

        if let Some(day) = trend_day(&mut analytics.daily_trend, summary.detected_at) {
            day.conflicts += 1;
        }
        if let Some(day) = summary
            .resolved_at
            .and_then(|resolved_at| trend_day(&mut analytics.daily_trend, resolved_at))
        {
            day.resolved += 1;
        }
    }

    if total > 0 {
        analytics.resolution_success_rate = succeeded as f64 / total as f64;
        analytics.automatic_resolution_rate = automatic as f64 / total as f64;
    }
    if !resolution_times.is_empty() {
        analytics.average_resolution_time_ms =
            resolution_times.iter().sum::<i64>() as f64 / resolution_times.len() as f64;
    }

    analytics
}

fn utc_date(timestamp_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|at| at.date_naive())
}

fn utc_hour(timestamp_ms: i64) -> Option<u32> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|at| at.hour())
}

fn empty_trend(now_ms: i64) -> Vec<DailyTrend> {
    let Some(today) = utc_date(now_ms) else {
        return Vec::new();
    };
    (0..TREND_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| DailyTrend {
            date,
            conflicts: 0,
            resolved: 0,
        })
        .collect()
}

fn trend_day(trend: &mut [DailyTrend], timestamp_ms: i64) -> Option<&mut DailyTrend> {
    let date = utc_date(timestamp_ms)?;
    trend.iter_mut().find(|day| day.date == date)
}

/// Analytics backed by the persisted audit log
pub struct AnalyticsService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: ConflictStore> AnalyticsService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn query(&self, filter: &AnalyticsFilter) -> Result<ConflictAnalytics> {
        let entries = self
            .store
            .list_audit_entries(&AuditQuery::from(filter))
            .await
            .map_err(|e| Error::AnalyticsQuery(e.to_string()))?;
        Ok(compute(&entries, filter, self.clock.now_ms()))
    }
}
