//! Analyzer output

use serde::{Deserialize, Serialize};

use super::strategy::{ResolutionStrategy, RiskLevel};

/// A non-primary strategy scored against the same conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeStrategy {
    pub strategy: ResolutionStrategy,
    pub confidence: f64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// How the analyzer proposes to resolve a conflict.
///
/// Recomputed on every analysis; only persisted as part of a manual
/// intervention record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecommendation {
    pub strategy: ResolutionStrategy,
    /// Estimated probability the strategy yields a correct reconciliation
    pub confidence: f64,
    pub reasoning: String,
    /// Estimated resolution latency (ms)
    pub estimated_resolution_ms: f64,
    pub risk_level: RiskLevel,
    /// Ranked by confidence, highest first
    pub alternative_strategies: Vec<AlternativeStrategy>,
}
