//! easel-core - Conflict resolution engine for Easel
//!
//! This crate contains the conflict models, the analyzer and resolution
//! strategies, the engine with its manual intervention queue and background
//! scheduler, and the libSQL-backed audit log used by the CLI and the
//! collaboration server.

pub mod analytics;
pub mod analyzer;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod outbox;
pub mod runtime;
pub mod scheduler;
pub mod strategies;
pub mod util;

pub use analyzer::ConflictAnalyzer;
pub use config::{ConfigError, EngineConfig};
pub use engine::{ConflictEngine, EngineCounters, ResolutionOutcome};
pub use error::{Error, Result};
pub use models::{Conflict, ConflictId, Operation, ResolutionContext, ResolutionStrategy};
pub use runtime::EngineRuntime;
