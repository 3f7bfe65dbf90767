//! Error types for easel-core

use thiserror::Error;

/// Result type alias using easel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in easel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Conflict failed validation before analysis
    #[error("Invalid conflict: {0}")]
    Validation(String),

    /// Another resolution attempt holds the conflict
    #[error("Conflict {0} is already being processed")]
    ConcurrentProcessing(String),

    /// Strategy produced no result operation
    #[error("Strategy {0} could not be applied")]
    StrategyApplication(String),

    /// Audit, notification or intervention write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Analytics could not be computed
    #[error("Analytics query failed: {0}")]
    AnalyticsQuery(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Conflict or notification not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
