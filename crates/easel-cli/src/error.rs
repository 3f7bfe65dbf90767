use std::io;

use easel_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] easel_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("No conflicts found in input")]
    EmptyInput,
    #[error("Invalid conflict on line {line}: {message}")]
    InvalidConflictLine { line: usize, message: String },
    #[error("Invalid timestamp: {0} (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidTimestamp(String),
    #[error("--since must not be later than --until")]
    InvalidTimeRange,
}
