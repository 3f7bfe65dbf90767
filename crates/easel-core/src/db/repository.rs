//! Conflict audit and intervention storage

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use libsql::params::Params;
use libsql::Value;
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    AnalyticsFilter, ConflictAuditEntry, ConflictId, InterventionStatus, ManualInterventionRecord,
    TimeRange,
};

/// Filter for audit log reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub workspace_id: Option<String>,
    pub conflict_id: Option<ConflictId>,
    pub time_range: Option<TimeRange>,
    pub limit: Option<usize>,
}

impl From<&AnalyticsFilter> for AuditQuery {
    fn from(filter: &AnalyticsFilter) -> Self {
        Self {
            workspace_id: filter.workspace_id.clone(),
            conflict_id: None,
            time_range: filter.time_range,
            limit: None,
        }
    }
}

/// Storage interface for everything the engine persists
pub trait ConflictStore: Send + Sync {
    /// Append one audit row; rows are never modified afterwards
    fn append_audit_entry(
        &self,
        entry: &ConflictAuditEntry,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Audit rows matching `query`, oldest first
    fn list_audit_entries(
        &self,
        query: &AuditQuery,
    ) -> impl Future<Output = Result<Vec<ConflictAuditEntry>>> + Send;

    fn save_intervention(
        &self,
        record: &ManualInterventionRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Move every open intervention for `conflict_id` to `status`
    fn update_intervention_status(
        &self,
        conflict_id: &ConflictId,
        status: InterventionStatus,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Intervention requests, newest first
    fn list_interventions(
        &self,
        status: Option<InterventionStatus>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ManualInterventionRecord>>> + Send;
}

/// libSQL implementation of `ConflictStore`
#[derive(Clone)]
pub struct LibSqlConflictStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlConflictStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open (and migrate) a file-backed store
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open a store backed by an in-memory database (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    fn parse_audit_entry(row: &libsql::Row) -> Result<ConflictAuditEntry> {
        let conflict_id: String = row.get(1)?;
        let action: String = row.get(5)?;
        let details: String = row.get(6)?;
        let metadata: String = row.get(8)?;

        Ok(ConflictAuditEntry {
            id: row.get(0)?,
            conflict_id: parse_conflict_id(&conflict_id)?,
            workspace_id: optional_text(row.get_value(2)?),
            session_id: optional_text(row.get_value(3)?),
            user_id: optional_text(row.get_value(4)?),
            action: action.parse()?,
            details: serde_json::from_str(&details)?,
            timestamp: row.get(7)?,
            metadata: serde_json::from_str(&metadata)?,
        })
    }

    fn parse_intervention(row: &libsql::Row) -> Result<ManualInterventionRecord> {
        let conflict_id: String = row.get(1)?;
        let status: String = row.get(3)?;
        let recommendation = optional_text(row.get_value(2)?)
            .map(|json| serde_json::from_str(&json))
            .transpose()?;

        Ok(ManualInterventionRecord {
            id: row.get(0)?,
            conflict_id: parse_conflict_id(&conflict_id)?,
            recommendation,
            status: status.parse()?,
            created_at: row.get(4)?,
        })
    }
}

impl ConflictStore for LibSqlConflictStore {
    async fn append_audit_entry(&self, entry: &ConflictAuditEntry) -> Result<()> {
        let details = serde_json::to_string(&entry.details)?;
        let metadata = serde_json::to_string(&entry.metadata)?;
        let params = Params::Positional(vec![
            Value::Text(entry.id.clone()),
            Value::Text(entry.conflict_id.as_str()),
            nullable_text(entry.workspace_id.as_deref()),
            nullable_text(entry.session_id.as_deref()),
            nullable_text(entry.user_id.as_deref()),
            Value::Text(entry.action.as_str().to_string()),
            Value::Text(details),
            Value::Integer(entry.timestamp),
            Value::Text(metadata),
        ]);

        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO conflict_audit_log
                    (id, conflict_id, workspace_id, session_id, user_id, action, details, timestamp, metadata)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params,
            )
            .await?;
        Ok(())
    }

    async fn list_audit_entries(&self, query: &AuditQuery) -> Result<Vec<ConflictAuditEntry>> {
        let mut sql = String::from(
            "SELECT id, conflict_id, workspace_id, session_id, user_id, action, details, timestamp, metadata
             FROM conflict_audit_log
             WHERE 1 = 1",
        );
        let mut values = Vec::new();

        if let Some(workspace_id) = &query.workspace_id {
            sql.push_str(" AND workspace_id = ?");
            values.push(Value::Text(workspace_id.clone()));
        }
        if let Some(conflict_id) = &query.conflict_id {
            sql.push_str(" AND conflict_id = ?");
            values.push(Value::Text(conflict_id.as_str()));
        }
        if let Some(range) = query.time_range {
            sql.push_str(" AND timestamp BETWEEN ? AND ?");
            values.push(Value::Integer(range.start));
            values.push(Value::Integer(range.end));
        }
        sql.push_str(" ORDER BY timestamp ASC, rowid ASC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(&sql, Params::Positional(values))
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_audit_entry(&row)?);
        }
        Ok(entries)
    }

    async fn save_intervention(&self, record: &ManualInterventionRecord) -> Result<()> {
        let recommendation = record
            .recommendation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let params = Params::Positional(vec![
            Value::Text(record.id.clone()),
            Value::Text(record.conflict_id.as_str()),
            nullable_text(recommendation.as_deref()),
            Value::Text(record.status.as_str().to_string()),
            Value::Integer(record.created_at),
        ]);

        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO manual_interventions (id, conflict_id, recommendation, status, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params,
            )
            .await?;
        Ok(())
    }

    async fn update_intervention_status(
        &self,
        conflict_id: &ConflictId,
        status: InterventionStatus,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "UPDATE manual_interventions SET status = ? WHERE conflict_id = ? AND status = 'pending'",
                libsql::params![status.as_str(), conflict_id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn list_interventions(
        &self,
        status: Option<InterventionStatus>,
        limit: usize,
    ) -> Result<Vec<ManualInterventionRecord>> {
        let db = self.db.lock().await;
        let mut rows = match status {
            Some(status) => {
                db.connection()
                    .query(
                        "SELECT id, conflict_id, recommendation, status, created_at
                         FROM manual_interventions
                         WHERE status = ?
                         ORDER BY created_at DESC
                         LIMIT ?",
                        libsql::params![status.as_str(), limit as i64],
                    )
                    .await?
            }
            None => {
                db.connection()
                    .query(
                        "SELECT id, conflict_id, recommendation, status, created_at
                         FROM manual_interventions
                         ORDER BY created_at DESC
                         LIMIT ?",
                        libsql::params![limit as i64],
                    )
                    .await?
            }
        };

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_intervention(&row)?);
        }
        Ok(records)
    }
}

fn parse_conflict_id(raw: &str) -> Result<ConflictId> {
    raw.parse()
        .map_err(|_| Error::Database(format!("invalid conflict id in storage: {raw}")))
}

fn nullable_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

fn optional_text(value: Value) -> Option<String> {
    match value {
        Value::Text(text) => Some(text),
        _ => None,
    }
}
