//! Conflict analyzer: confidence, complexity, strategy choice and risk

#![allow(clippy::cast_precision_loss)] // operation counts are far below f64 precision

use crate::catalog::{self, StrategyCatalog};
use crate::error::{Error, Result};
use crate::models::{
    AlternativeStrategy, Conflict, ConflictType, ResolutionRecommendation, ResolutionStrategy,
    RiskLevel, Severity,
};

const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;
const HIGH_CONFIDENCE: f64 = 0.8;
const MODERATE_CONFIDENCE: f64 = 0.5;

/// Scores conflicts and recommends a resolution strategy
#[derive(Debug, Clone, Default)]
pub struct ConflictAnalyzer {
    catalog: StrategyCatalog,
}

impl ConflictAnalyzer {
    pub const fn new(catalog: StrategyCatalog) -> Self {
        Self { catalog }
    }

    pub const fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Produce a recommendation for `conflict`.
    ///
    /// Rejects conflicts without operations.
    pub fn analyze(&self, conflict: &Conflict) -> Result<ResolutionRecommendation> {
        if conflict.operations.is_empty() {
            return Err(Error::Validation(format!(
                "conflict {} has no operations",
                conflict.id
            )));
        }

        let complexity = Self::complexity(conflict);
        let base_confidence = Self::base_confidence(conflict);
        let confidence = base_confidence * complexity.mul_add(-0.2, 1.0);
        let strategy = self.select_strategy(conflict, confidence);
        let risk_level = Self::assess_risk_level(conflict, strategy);
        let estimated_resolution_ms = Self::estimate_resolution_ms(conflict, strategy, complexity);
        let alternative_strategies = Self::alternatives(conflict, strategy, base_confidence);

        Ok(ResolutionRecommendation {
            strategy,
            confidence,
            reasoning: Self::reasoning(conflict, strategy, confidence, complexity, risk_level),
            estimated_resolution_ms,
            risk_level,
            alternative_strategies,
        })
    }

    /// Type confidence plus severity adjustment, clamped to `[0.1, 0.95]`
    pub fn base_confidence(conflict: &Conflict) -> f64 {
        (catalog::base_confidence(conflict.conflict_type)
            + catalog::severity_adjustment(conflict.severity))
        .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    /// Complexity score in `[0, 1]`
    pub fn complexity(conflict: &Conflict) -> f64 {
        let mut score = (conflict.operations.len() as f64 / 10.0).min(0.5);

        if let Some(overlap) = &conflict.spatial_overlap {
            score += overlap.percentage.clamp(0.0, 1.0) * 0.3;
        }

        if let Some(semantic) = &conflict.semantic_conflict {
            score += (semantic.incompatible_changes.len() as f64 / 5.0).min(0.4);
        }

        score.min(1.0)
    }

    pub fn select_strategy(&self, conflict: &Conflict, confidence: f64) -> ResolutionStrategy {
        if confidence > HIGH_CONFIDENCE {
            self.catalog.for_severity(conflict.severity)
        } else if confidence > MODERATE_CONFIDENCE {
            self.catalog.for_type(conflict.conflict_type)
        } else {
            ResolutionStrategy::Manual
        }
    }

    pub fn estimate_resolution_ms(
        conflict: &Conflict,
        strategy: ResolutionStrategy,
        complexity: f64,
    ) -> f64 {
        let operations = conflict.operations.len() as f64;
        catalog::base_latency_ms(strategy) * (1.0 + complexity) * operations.mul_add(0.1, 1.0)
    }

    pub fn assess_risk_level(conflict: &Conflict, strategy: ResolutionStrategy) -> RiskLevel {
        if strategy.is_manual() {
            return RiskLevel::Low;
        }
        if conflict.severity == Severity::Critical {
            return RiskLevel::High;
        }
        if conflict.conflict_type == ConflictType::Semantic && strategy != ResolutionStrategy::Merge
        {
            return RiskLevel::High;
        }
        if conflict.operations.len() > 5 {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }

    /// Every other catalogued strategy scored against the pre-complexity
    /// confidence, highest first
    pub fn alternatives(
        conflict: &Conflict,
        primary: ResolutionStrategy,
        base_confidence: f64,
    ) -> Vec<AlternativeStrategy> {
        let mut alternatives = ResolutionStrategy::ALL
            .into_iter()
            .filter(|strategy| *strategy != primary)
            .filter_map(|strategy| {
                catalog::alternative_confidence(strategy, conflict.conflict_type, base_confidence).map(
                    |confidence| AlternativeStrategy {
                        strategy,
                        confidence,
                        pros: catalog::pros(strategy),
                        cons: catalog::cons(strategy),
                    },
                )
            })
            .collect::<Vec<_>>();

        alternatives.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        alternatives
    }

    fn reasoning(
        conflict: &Conflict,
        strategy: ResolutionStrategy,
        confidence: f64,
        complexity: f64,
        risk_level: RiskLevel,
    ) -> String {
        let basis = if strategy.is_manual() {
            "confidence too low for automatic resolution"
        } else if confidence > HIGH_CONFIDENCE {
            "high confidence, chosen by severity"
        } else {
            "moderate confidence, chosen by conflict type"
        };
        format!(
            "{} {} conflict across {} operation(s): {basis}; confidence {confidence:.2}, complexity {complexity:.2}, {risk_level} risk",
            conflict.severity,
            conflict.conflict_type,
            conflict.operations.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operation;

    fn conflict(kind: ConflictType, severity: Severity, ops: usize) -> Conflict {
        let operations = (0..ops)
            .map(|i| Operation::new(format!("user-{i}"), i64::try_from(i).unwrap() * 100))
            .collect();
        Conflict::new(kind, severity, operations, 0)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn spatial_low_prefers_last_write_wins() {
        let analyzer = ConflictAnalyzer::default();
        let conflict = conflict(ConflictType::Spatial, Severity::Low, 2);

        assert!(approx(ConflictAnalyzer::base_confidence(&conflict), 0.8));

        let recommendation = analyzer.analyze(&conflict).unwrap();
        assert_eq!(recommendation.strategy, ResolutionStrategy::LastWriteWins);
        assert!(approx(recommendation.confidence, 0.8 * 0.96));
        assert_eq!(recommendation.risk_level, RiskLevel::Low);
    }

    #[test]
    fn temporal_confidence_is_clamped() {
        let expected = [
            (Severity::Low, 0.95),
            (Severity::Medium, 0.9),
            (Severity::High, 0.8),
            (Severity::Critical, 0.7),
        ];
        for (severity, value) in expected {
            let conflict = conflict(ConflictType::Temporal, severity, 1);
            assert!(approx(ConflictAnalyzer::base_confidence(&conflict), value));
        }
    }

    #[test]
    fn compound_critical_is_clamped_to_floor() {
        let conflict = conflict(ConflictType::Compound, Severity::Critical, 1);
        assert!(approx(ConflictAnalyzer::base_confidence(&conflict), 0.1));
        let recommendation = ConflictAnalyzer::default().analyze(&conflict).unwrap();
        assert_eq!(recommendation.strategy, ResolutionStrategy::Manual);
        assert_eq!(recommendation.risk_level, RiskLevel::Low);
    }

    #[test]
    fn complexity_sums_all_components_and_caps() {
        let mixed = conflict(ConflictType::Spatial, Severity::Medium, 3)
            .with_spatial_overlap(0.5)
            .with_incompatible_changes(["fill", "stroke"]);
        assert!(approx(ConflictAnalyzer::complexity(&mixed), 0.3 + 0.15 + 0.4));

        let saturated = conflict(ConflictType::Spatial, Severity::Medium, 20)
            .with_spatial_overlap(1.0)
            .with_incompatible_changes(["a", "b", "c", "d", "e", "f"]);
        assert!(approx(ConflictAnalyzer::complexity(&saturated), 1.0));
    }

    #[test]
    fn high_confidence_uses_severity_table() {
        let conflict = conflict(ConflictType::Temporal, Severity::Low, 1);
        let recommendation = ConflictAnalyzer::default().analyze(&conflict).unwrap();
        assert!(recommendation.confidence > HIGH_CONFIDENCE);
        assert_eq!(recommendation.strategy, ResolutionStrategy::LastWriteWins);
    }

    #[test]
    fn semantic_conflict_without_merge_is_high_risk() {
        let conflict = conflict(ConflictType::Semantic, Severity::Low, 2);
        assert_eq!(
            ConflictAnalyzer::assess_risk_level(&conflict, ResolutionStrategy::LastWriteWins),
            RiskLevel::High
        );
        assert_eq!(
            ConflictAnalyzer::assess_risk_level(&conflict, ResolutionStrategy::Merge),
            RiskLevel::Low
        );
    }

    #[test]
    fn critical_is_never_low_risk_unless_manual() {
        for kind in ConflictType::ALL {
            for ops in 1..8 {
                let conflict = conflict(kind, Severity::Critical, ops);
                for strategy in ResolutionStrategy::ALL {
                    let risk = ConflictAnalyzer::assess_risk_level(&conflict, strategy);
                    if strategy.is_manual() {
                        assert_eq!(risk, RiskLevel::Low);
                    } else {
                        assert_ne!(risk, RiskLevel::Low);
                    }
                }
            }
        }
    }

    #[test]
    fn many_operations_raise_risk_to_medium() {
        let conflict = conflict(ConflictType::Spatial, Severity::Low, 6);
        assert_eq!(
            ConflictAnalyzer::assess_risk_level(&conflict, ResolutionStrategy::LastWriteWins),
            RiskLevel::Medium
        );
    }

    #[test]
    fn estimated_time_scales_with_complexity_and_operations() {
        let conflict = conflict(ConflictType::Spatial, Severity::Low, 2);
        let estimate = ConflictAnalyzer::estimate_resolution_ms(
            &conflict,
            ResolutionStrategy::Merge,
            0.2,
        );
        assert!(approx(estimate, 200.0 * 1.2 * 1.2));
        assert!(approx(
            ConflictAnalyzer::estimate_resolution_ms(&conflict, ResolutionStrategy::Manual, 0.9),
            0.0
        ));
    }

    #[test]
    fn alternatives_exclude_primary_and_are_sorted() {
        let conflict = conflict(ConflictType::Spatial, Severity::Low, 2);
        let alternatives = ConflictAnalyzer::alternatives(
            &conflict,
            ResolutionStrategy::LastWriteWins,
            0.8,
        );
        let strategies = alternatives
            .iter()
            .map(|alt| alt.strategy)
            .collect::<Vec<_>>();
        assert_eq!(
            strategies,
            vec![
                ResolutionStrategy::Manual,
                ResolutionStrategy::PriorityUser,
                ResolutionStrategy::Merge,
            ]
        );
        assert!(alternatives
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence));
    }

    #[test]
    fn alternatives_use_pre_complexity_confidence() {
        let conflict = conflict(ConflictType::Spatial, Severity::Low, 2);
        let recommendation = ConflictAnalyzer::default().analyze(&conflict).unwrap();
        assert!(approx(recommendation.confidence, 0.768));

        let confidence_of = |strategy: ResolutionStrategy| {
            recommendation
                .alternative_strategies
                .iter()
                .find(|alt| alt.strategy == strategy)
                .map(|alt| alt.confidence)
                .unwrap()
        };
        assert!(approx(confidence_of(ResolutionStrategy::PriorityUser), 0.8 * 0.8));
        assert!(approx(confidence_of(ResolutionStrategy::Merge), 0.8 * 0.6));
        assert!(approx(confidence_of(ResolutionStrategy::Manual), 0.95));
    }

    #[test]
    fn empty_conflict_is_rejected() {
        let conflict = conflict(ConflictType::Spatial, Severity::Low, 0);
        let error = ConflictAnalyzer::default().analyze(&conflict).unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
    }
}
