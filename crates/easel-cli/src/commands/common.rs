use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use easel_core::db::LibSqlConflictStore;
use easel_core::models::{
    AnalyticsFilter, Conflict, ConflictAnalytics, ManualInterventionRecord,
    ResolutionRecommendation,
};
use easel_core::{EngineConfig, ResolutionContext, ResolutionOutcome};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    pub conflict_id: String,
    pub recommendation: ResolutionRecommendation,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("EASEL_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("easel")
        .join("easel.db")
}

pub async fn open_store(db_path: &Path) -> Result<LibSqlConflictStore, CliError> {
    Ok(LibSqlConflictStore::open(db_path).await?)
}

pub fn load_config() -> Result<EngineConfig, CliError> {
    Ok(EngineConfig::from_env()?)
}

pub fn resolution_context(workspace: Option<String>) -> ResolutionContext {
    ResolutionContext {
        workspace_id: easel_core::util::normalize_text_option(workspace),
        user_id: easel_core::util::normalize_text_option(env::var("USER").ok()),
        ..ResolutionContext::default()
    }
}

/// Read a file, or stdin when `path` is `-`
pub fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        Ok(input)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Parse a single conflict object or an array of conflicts
pub fn parse_conflicts(input: &str) -> Result<Vec<Conflict>, CliError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyInput);
    }

    let conflicts = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<Conflict>>(trimmed)?
    } else {
        vec![serde_json::from_str::<Conflict>(trimmed)?]
    };

    if conflicts.is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(conflicts)
}

/// Parse one line of newline-delimited conflict JSON.
///
/// Blank lines yield `None`.
pub fn parse_conflict_line(line: &str, line_number: usize) -> Result<Option<Conflict>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| CliError::InvalidConflictLine {
            line: line_number,
            message: e.to_string(),
        })
}

/// Parse an RFC 3339 timestamp or a bare date (midnight UTC) into Unix ms
pub fn parse_timestamp(value: &str) -> Result<i64, CliError> {
    let value = value.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.timestamp_millis());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc().timestamp_millis())
        .ok_or_else(|| CliError::InvalidTimestamp(value.to_string()))
}

pub fn build_filter(
    workspace: Option<String>,
    since: Option<&str>,
    until: Option<&str>,
) -> Result<AnalyticsFilter, CliError> {
    let mut filter = AnalyticsFilter {
        workspace_id: easel_core::util::normalize_text_option(workspace),
        time_range: None,
    };

    if since.is_some() || until.is_some() {
        let start = since.map(parse_timestamp).transpose()?.unwrap_or(0);
        let end = until.map(parse_timestamp).transpose()?.unwrap_or(i64::MAX);
        if start > end {
            return Err(CliError::InvalidTimeRange);
        }
        filter = filter.with_time_range(start, end);
    }

    Ok(filter)
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_recommendation_line(conflict: &Conflict, recommendation: &ResolutionRecommendation) -> String {
    format!(
        "{:<13}  {:<10} {:<8}  {:<16}  {:.2}  {} risk",
        short_id(&conflict.id.to_string()),
        conflict.conflict_type.as_str(),
        conflict.severity.as_str(),
        recommendation.strategy.as_str(),
        recommendation.confidence,
        recommendation.risk_level
    )
}

pub fn format_outcome_line(conflict: &Conflict, outcome: &ResolutionOutcome) -> String {
    let id = short_id(&conflict.id.to_string());
    match (&outcome.resolution, &outcome.error) {
        (Some(resolution), _) => format!(
            "{id:<13}  resolved  {:<16}  {:.2}  winner={}",
            resolution.strategy.as_str(),
            resolution.confidence,
            resolution.result_operation.user_id
        ),
        (None, error) if outcome.requires_manual_intervention => format!(
            "{id:<13}  manual    {}",
            error.as_deref().unwrap_or("manual intervention required")
        ),
        (None, error) => format!(
            "{id:<13}  failed    {}",
            error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn format_intervention_lines(records: &[ManualInterventionRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let strategy = record
                .recommendation
                .as_ref()
                .map_or("-", |recommendation| recommendation.strategy.as_str());
            format!(
                "{}  {:<8}  conflict={}  recommended={strategy}",
                format_timestamp(record.created_at),
                record.status.as_str(),
                record.conflict_id
            )
        })
        .collect()
}

pub fn format_analytics_lines(analytics: &ConflictAnalytics) -> Vec<String> {
    let mut lines = vec![
        format!("Total conflicts:      {}", analytics.total_conflicts),
        format!(
            "Success rate:         {:.1}%",
            analytics.resolution_success_rate * 100.0
        ),
        format!(
            "Automatic rate:       {:.1}%",
            analytics.automatic_resolution_rate * 100.0
        ),
        format!(
            "Avg resolution time:  {:.0} ms",
            analytics.average_resolution_time_ms
        ),
    ];

    if let Some(hour) = analytics.busiest_hour() {
        lines.push(format!("Busiest hour (UTC):   {hour:02}:00"));
    }

    if !analytics.conflicts_by_type.is_empty() {
        lines.push("By type:".to_string());
        for (conflict_type, count) in &analytics.conflicts_by_type {
            lines.push(format!("  {:<12} {count}", conflict_type.as_str()));
        }
    }

    if !analytics.conflicts_by_severity.is_empty() {
        lines.push("By severity:".to_string());
        for (severity, count) in &analytics.conflicts_by_severity {
            lines.push(format!("  {:<12} {count}", severity.as_str()));
        }
    }

    if !analytics.user_participation.is_empty() {
        lines.push("Participants:".to_string());
        for (user, count) in &analytics.user_participation {
            lines.push(format!("  {user:<12} {count}"));
        }
    }

    lines
}
