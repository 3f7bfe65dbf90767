use std::path::PathBuf;

use easel_core::db::{AuditQuery, ConflictStore};
use easel_core::models::{
    AuditAction, ConflictAnalytics, ConflictType, InterventionStatus, ManualInterventionRecord,
    Operation, ResolutionStrategy, Severity,
};
use easel_core::{Conflict, ConflictId, ResolutionOutcome};
use pretty_assertions::assert_eq;

use crate::cli::StatusFilter;
use crate::commands::common::{
    build_filter, format_analytics_lines, format_intervention_lines, format_outcome_line,
    open_store, parse_conflict_line, parse_conflicts, parse_timestamp, resolve_db_path,
    short_id,
};
use crate::commands::interventions::run_interventions;
use crate::commands::resolve::run_resolve;
use crate::error::CliError;

const CONFLICT_JSON: &str = r#"{
    "type": "spatial",
    "severity": "low",
    "detected_at": 1710079200000,
    "operations": [
        {"user_id": "alice", "timestamp": 100, "data": {"x": 1}},
        {"user_id": "bob", "timestamp": 200, "data": {"x": 2}}
    ]
}"#;

#[test]
fn parse_conflicts_accepts_object_and_array() {
    let single = parse_conflicts(CONFLICT_JSON).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].conflict_type, ConflictType::Spatial);
    assert_eq!(single[0].operations[1].user_id, "bob");

    let array = parse_conflicts(&format!("[{CONFLICT_JSON}, {CONFLICT_JSON}]")).unwrap();
    assert_eq!(array.len(), 2);
    assert_ne!(array[0].id, array[1].id);
}

#[test]
fn parse_conflicts_rejects_empty_input() {
    assert!(matches!(parse_conflicts("  \n"), Err(CliError::EmptyInput)));
    assert!(matches!(parse_conflicts("[]"), Err(CliError::EmptyInput)));
    assert!(matches!(
        parse_conflicts("{\"type\": \"bogus\"}"),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn parse_conflict_line_skips_blank_lines_and_reports_line_numbers() {
    assert!(parse_conflict_line("   ", 1).unwrap().is_none());

    let line = CONFLICT_JSON.replace('\n', " ");
    assert!(parse_conflict_line(&line, 2).unwrap().is_some());

    match parse_conflict_line("{not json", 7) {
        Err(CliError::InvalidConflictLine { line, .. }) => assert_eq!(line, 7),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn parse_timestamp_accepts_rfc3339_and_dates() {
    assert_eq!(
        parse_timestamp("2024-03-10T14:00:00Z").unwrap(),
        1_710_079_200_000
    );
    assert_eq!(parse_timestamp("2024-03-10").unwrap(), 1_710_028_800_000);
    assert!(matches!(
        parse_timestamp("yesterday"),
        Err(CliError::InvalidTimestamp(_))
    ));
}

#[test]
fn build_filter_validates_window() {
    let filter = build_filter(Some(" ws-1 ".to_string()), Some("2024-03-01"), None).unwrap();
    assert_eq!(filter.workspace_id.as_deref(), Some("ws-1"));
    let range = filter.time_range.unwrap();
    assert_eq!(range.end, i64::MAX);

    let unbounded = build_filter(Some("  ".to_string()), None, None).unwrap();
    assert_eq!(unbounded.workspace_id, None);
    assert_eq!(unbounded.time_range, None);

    assert!(matches!(
        build_filter(None, Some("2024-03-10"), Some("2024-03-01")),
        Err(CliError::InvalidTimeRange)
    ));
}

#[test]
fn resolve_db_path_prefers_cli_argument() {
    let explicit = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn status_filter_maps_to_intervention_status() {
    assert_eq!(
        InterventionStatus::from(StatusFilter::Pending),
        InterventionStatus::Pending
    );
    assert_eq!(
        InterventionStatus::from(StatusFilter::Expired),
        InterventionStatus::Expired
    );
}

#[test]
fn format_outcome_line_reports_manual_and_failed() {
    let conflict = parse_conflicts(CONFLICT_JSON).unwrap().remove(0);
    let mut outcome = ResolutionOutcome {
        success: false,
        resolution: None,
        error: Some("Conflict requires manual intervention".to_string()),
        requires_manual_intervention: true,
        conflict: None,
    };

    let line = format_outcome_line(&conflict, &outcome);
    assert!(line.starts_with(&short_id(&conflict.id.to_string())));
    assert!(line.contains("manual    Conflict requires manual intervention"));

    outcome.requires_manual_intervention = false;
    outcome.error = Some("Automatic resolution is disabled".to_string());
    let line = format_outcome_line(&conflict, &outcome);
    assert!(line.contains("failed    Automatic resolution is disabled"));
}

#[test]
fn format_intervention_lines_include_status_and_strategy() {
    let record = ManualInterventionRecord::pending(ConflictId::new(), None, 1_710_079_200_000);
    let lines = format_intervention_lines(&[record.clone()]);
    assert_eq!(
        lines,
        vec![format!(
            "2024-03-10 14:00:00 UTC  pending   conflict={}  recommended=-",
            record.conflict_id
        )]
    );
}

#[test]
fn format_analytics_lines_summarizes_rates() {
    let mut analytics = ConflictAnalytics {
        total_conflicts: 4,
        resolution_success_rate: 0.75,
        automatic_resolution_rate: 0.5,
        average_resolution_time_ms: 120.0,
        ..ConflictAnalytics::default()
    };
    analytics.peak_hours.insert(9, 3);
    analytics.conflicts_by_type.insert(ConflictType::Spatial, 4);

    let lines = format_analytics_lines(&analytics);
    assert_eq!(lines[0], "Total conflicts:      4");
    assert_eq!(lines[1], "Success rate:         75.0%");
    assert!(lines.contains(&"Busiest hour (UTC):   09:00".to_string()));
    assert!(lines.contains(&"  spatial      4".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_command_persists_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("easel.db");
    let input = dir.path().join("conflicts.json");
    let critical = Conflict::new(
        ConflictType::Semantic,
        Severity::Critical,
        vec![Operation::new("alice", 1), Operation::new("carol", 2)],
        1_710_079_200_000,
    );
    let critical_json = serde_json::to_string(&critical).unwrap();
    std::fs::write(&input, format!("[{CONFLICT_JSON}, {critical_json}]")).unwrap();

    run_resolve(&input, Some("ws-1".to_string()), true, &db_path)
        .await
        .unwrap();

    let store = open_store(&db_path).await.unwrap();
    let entries = store
        .list_audit_entries(&AuditQuery::default())
        .await
        .unwrap();
    let succeeded = entries
        .iter()
        .filter(|entry| entry.action == AuditAction::ResolutionSucceeded)
        .collect::<Vec<_>>();
    assert_eq!(succeeded.len(), 1);
    assert_eq!(
        succeeded[0].details.strategy,
        Some(ResolutionStrategy::LastWriteWins)
    );
    assert!(entries
        .iter()
        .all(|entry| entry.workspace_id.as_deref() == Some("ws-1")));

    let pending = store
        .list_interventions(Some(InterventionStatus::Pending), 10)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].conflict_id, critical.id);

    run_interventions(Some(StatusFilter::Pending), 5, false, &db_path)
        .await
        .unwrap();
}
