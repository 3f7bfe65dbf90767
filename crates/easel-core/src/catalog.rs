//! Strategy catalog: default strategy tables and per-strategy metadata

use serde::{Deserialize, Serialize};

use crate::models::{ConflictType, ResolutionStrategy, Severity};

/// Default strategy per severity, used when confidence is high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityTable {
    pub low: ResolutionStrategy,
    pub medium: ResolutionStrategy,
    pub high: ResolutionStrategy,
    pub critical: ResolutionStrategy,
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self {
            low: ResolutionStrategy::LastWriteWins,
            medium: ResolutionStrategy::Merge,
            high: ResolutionStrategy::PriorityUser,
            critical: ResolutionStrategy::Manual,
        }
    }
}

/// Default strategy per conflict type, used when confidence is moderate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    pub spatial: ResolutionStrategy,
    pub temporal: ResolutionStrategy,
    pub semantic: ResolutionStrategy,
    pub ordering: ResolutionStrategy,
    pub dependency: ResolutionStrategy,
    pub compound: ResolutionStrategy,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self {
            spatial: ResolutionStrategy::LastWriteWins,
            temporal: ResolutionStrategy::LastWriteWins,
            semantic: ResolutionStrategy::Merge,
            ordering: ResolutionStrategy::PriorityUser,
            dependency: ResolutionStrategy::Manual,
            compound: ResolutionStrategy::Manual,
        }
    }
}

/// Static strategy configuration consulted by the analyzer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCatalog {
    #[serde(default)]
    pub by_severity: SeverityTable,
    #[serde(default)]
    pub by_type: TypeTable,
}

impl StrategyCatalog {
    pub const fn for_severity(&self, severity: Severity) -> ResolutionStrategy {
        match severity {
            Severity::Low => self.by_severity.low,
            Severity::Medium => self.by_severity.medium,
            Severity::High => self.by_severity.high,
            Severity::Critical => self.by_severity.critical,
        }
    }

    pub const fn for_type(&self, conflict_type: ConflictType) -> ResolutionStrategy {
        match conflict_type {
            ConflictType::Spatial => self.by_type.spatial,
            ConflictType::Temporal => self.by_type.temporal,
            ConflictType::Semantic => self.by_type.semantic,
            ConflictType::Ordering => self.by_type.ordering,
            ConflictType::Dependency => self.by_type.dependency,
            ConflictType::Compound => self.by_type.compound,
        }
    }
}

/// Starting confidence before severity and complexity adjustments
pub const fn base_confidence(conflict_type: ConflictType) -> f64 {
    match conflict_type {
        ConflictType::Temporal => 0.9,
        ConflictType::Spatial => 0.7,
        ConflictType::Semantic | ConflictType::Ordering | ConflictType::Dependency => 0.5,
        ConflictType::Compound => 0.3,
    }
}

pub const fn severity_adjustment(severity: Severity) -> f64 {
    match severity {
        Severity::Low => 0.1,
        Severity::Medium => 0.0,
        Severity::High => -0.1,
        Severity::Critical => -0.2,
    }
}

/// Typical latency of a strategy before complexity scaling (ms)
pub const fn base_latency_ms(strategy: ResolutionStrategy) -> f64 {
    match strategy {
        ResolutionStrategy::LastWriteWins => 50.0,
        ResolutionStrategy::PriorityUser => 100.0,
        ResolutionStrategy::Merge => 200.0,
        ResolutionStrategy::Automatic => 150.0,
        ResolutionStrategy::Manual => 0.0,
    }
}

/// Confidence of `strategy` as an alternative, derived from the primary
/// confidence. `None` means the strategy is never offered as an alternative.
pub fn alternative_confidence(
    strategy: ResolutionStrategy,
    conflict_type: ConflictType,
    confidence: f64,
) -> Option<f64> {
    match strategy {
        ResolutionStrategy::LastWriteWins => Some(confidence * 0.9),
        ResolutionStrategy::PriorityUser => Some(confidence * 0.8),
        ResolutionStrategy::Merge if conflict_type == ConflictType::Semantic => {
            Some(confidence * 0.9)
        }
        ResolutionStrategy::Merge => Some(confidence * 0.6),
        ResolutionStrategy::Manual => Some(0.95),
        ResolutionStrategy::Automatic => None,
    }
}

pub fn pros(strategy: ResolutionStrategy) -> Vec<String> {
    let items: &[&str] = match strategy {
        ResolutionStrategy::LastWriteWins => &["Fast and deterministic", "Simple to explain"],
        ResolutionStrategy::PriorityUser => &[
            "Respects collaborator roles",
            "Predictable for document owners",
        ],
        ResolutionStrategy::Merge => &["Keeps changes from every collaborator"],
        ResolutionStrategy::Automatic => &["Chooses a rule per conflict"],
        ResolutionStrategy::Manual => &["A person makes the final call", "Highest accuracy"],
    };
    items.iter().map(ToString::to_string).collect()
}

pub fn cons(strategy: ResolutionStrategy) -> Vec<String> {
    let items: &[&str] = match strategy {
        ResolutionStrategy::LastWriteWins => &[
            "Discards concurrent edits",
            "Depends on client clock accuracy",
        ],
        ResolutionStrategy::PriorityUser => &[
            "Edits from lower-priority users are lost",
            "Needs an up-to-date priority order",
        ],
        ResolutionStrategy::Merge => &[
            "Slower than picking a winner",
            "May combine fields in ways nobody intended",
        ],
        ResolutionStrategy::Automatic => &["Harder for users to predict"],
        ResolutionStrategy::Manual => &[
            "Blocks until someone responds",
            "Adds coordination overhead",
        ],
    };
    items.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_cover_every_variant() {
        let catalog = StrategyCatalog::default();
        assert_eq!(
            catalog.for_severity(Severity::Low),
            ResolutionStrategy::LastWriteWins
        );
        assert_eq!(
            catalog.for_severity(Severity::Critical),
            ResolutionStrategy::Manual
        );
        assert_eq!(
            catalog.for_type(ConflictType::Semantic),
            ResolutionStrategy::Merge
        );
        assert_eq!(
            catalog.for_type(ConflictType::Compound),
            ResolutionStrategy::Manual
        );
    }

    #[test]
    fn merge_alternative_favours_semantic_conflicts() {
        let semantic =
            alternative_confidence(ResolutionStrategy::Merge, ConflictType::Semantic, 0.8)
                .unwrap();
        let spatial =
            alternative_confidence(ResolutionStrategy::Merge, ConflictType::Spatial, 0.8).unwrap();
        assert!((semantic - 0.72).abs() < 1e-9);
        assert!((spatial - 0.48).abs() < 1e-9);
        assert_eq!(
            alternative_confidence(ResolutionStrategy::Manual, ConflictType::Spatial, 0.1),
            Some(0.95)
        );
        assert_eq!(
            alternative_confidence(ResolutionStrategy::Automatic, ConflictType::Spatial, 0.9),
            None
        );
    }

    #[test]
    fn every_strategy_has_pros_and_cons() {
        for strategy in ResolutionStrategy::ALL {
            assert!(!pros(strategy).is_empty());
            assert!(!cons(strategy).is_empty());
        }
    }
}
