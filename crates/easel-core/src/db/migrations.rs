//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Execute `statements` in one transaction, rolling back on the first failure
async fn apply(conn: &Connection, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

/// Migration to version 1: audit log
async fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS conflict_audit_log (
                id TEXT PRIMARY KEY,
                conflict_id TEXT NOT NULL,
                workspace_id TEXT,
                session_id TEXT,
                user_id TEXT,
                action TEXT NOT NULL,
                details TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            )",
            "CREATE INDEX IF NOT EXISTS idx_audit_conflict ON conflict_audit_log(conflict_id)",
            "CREATE INDEX IF NOT EXISTS idx_audit_workspace_time ON conflict_audit_log(workspace_id, timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON conflict_audit_log(timestamp)",
            // Audit rows are never rewritten or removed
            "CREATE TRIGGER IF NOT EXISTS conflict_audit_log_no_update BEFORE UPDATE ON conflict_audit_log
             BEGIN
                 SELECT RAISE(ABORT, 'conflict_audit_log is append-only');
             END",
            "CREATE TRIGGER IF NOT EXISTS conflict_audit_log_no_delete BEFORE DELETE ON conflict_audit_log
             BEGIN
                 SELECT RAISE(ABORT, 'conflict_audit_log is append-only');
             END",
            "INSERT INTO schema_version (version) VALUES (1)",
        ],
    )
    .await?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: manual intervention requests
async fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        &[
            "CREATE TABLE IF NOT EXISTS manual_interventions (
                id TEXT PRIMARY KEY,
                conflict_id TEXT NOT NULL,
                recommendation TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_interventions_conflict ON manual_interventions(conflict_id)",
            "CREATE INDEX IF NOT EXISTS idx_interventions_status ON manual_interventions(status, created_at)",
            "INSERT INTO schema_version (version) VALUES (2)",
        ],
    )
    .await?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
        assert!(table_exists(&conn, "conflict_audit_log").await);
        assert!(table_exists(&conn, "manual_interventions").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_audit_log_rejects_updates() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        conn.execute(
            "INSERT INTO conflict_audit_log (id, conflict_id, action, details, timestamp)
             VALUES ('a', 'c', 'conflict_detected', '{}', 1)",
            (),
        )
        .await
        .unwrap();

        assert!(conn
            .execute("UPDATE conflict_audit_log SET action = 'x'", ())
            .await
            .is_err());
        assert!(conn
            .execute("DELETE FROM conflict_audit_log", ())
            .await
            .is_err());
    }
}
