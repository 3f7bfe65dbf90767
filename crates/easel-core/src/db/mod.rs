//! Database layer for Easel

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{AuditQuery, ConflictStore, LibSqlConflictStore};
