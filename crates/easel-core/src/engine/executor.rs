//! Automatic resolution

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ConflictEngine, EngineState, TrackedConflict};
use crate::error::{Error, Result};
use crate::models::{
    AuditAction, AuditDetails, Conflict, ConflictId, ConflictResolution, ConflictStatus,
    ResolutionContext, ResolutionRecommendation, ResolutionStrategy, RiskLevel,
};
use crate::strategies;
use crate::util::compact_text;

/// Structured result of a resolution attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub requires_manual_intervention: bool,
    /// The conflict as it stood when the attempt finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<Conflict>,
}

impl ResolutionOutcome {
    fn resolved(conflict: Conflict) -> Self {
        Self {
            success: true,
            resolution: conflict.resolution.clone(),
            error: None,
            requires_manual_intervention: false,
            conflict: Some(conflict),
        }
    }

    fn manual(conflict: Option<Conflict>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            resolution: None,
            error: Some(error.into()),
            requires_manual_intervention: true,
            conflict,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            resolution: None,
            error: Some(error.into()),
            requires_manual_intervention: false,
            conflict: None,
        }
    }
}

impl ConflictEngine {
    /// Try to resolve a tracked conflict without human involvement.
    ///
    /// Never returns an error: rejections and failures are reported in the
    /// outcome. A conflict already being processed is rejected immediately
    /// without touching its state.
    pub async fn resolve_automatically(&self, conflict_id: ConflictId) -> ResolutionOutcome {
        if !self.inner.config.automatic_resolution_enabled {
            return ResolutionOutcome::rejected("Automatic resolution is disabled");
        }

        let claimed = self.inner.state.lock().await.claim(conflict_id);
        self.resolve_claimed(conflict_id, claimed).await
    }

    /// Submit a conflict and resolve it immediately.
    ///
    /// The conflict is tracked and claimed under one lock acquisition, so
    /// the expiry sweeper cannot evict it before the attempt starts.
    pub async fn handle_conflict(
        &self,
        conflict: Conflict,
        context: ResolutionContext,
    ) -> Result<ResolutionOutcome> {
        let (conflict_id, claimed) = {
            let mut state = self.inner.state.lock().await;
            let conflict_id = self.track(&mut state, conflict, context)?;
            if !self.inner.config.automatic_resolution_enabled {
                return Ok(ResolutionOutcome::rejected("Automatic resolution is disabled"));
            }
            (conflict_id, state.claim(conflict_id))
        };
        Ok(self.resolve_claimed(conflict_id, claimed).await)
    }

    async fn resolve_claimed(
        &self,
        conflict_id: ConflictId,
        claimed: Result<TrackedConflict>,
    ) -> ResolutionOutcome {
        let tracked = match claimed {
            Ok(tracked) => tracked,
            Err(e) => {
                debug!(conflict_id = %conflict_id, error = %e, "Resolution rejected");
                return ResolutionOutcome::rejected(e.to_string());
            }
        };

        let started_at = self.inner.clock.now_ms();
        let analysis = self.inner.analyzer.analyze(&tracked.conflict);

        let mut state = self.inner.state.lock().await;
        let result = analysis.and_then(|recommendation| {
            self.execute(&mut state, conflict_id, &recommendation, started_at)
        });
        state.in_flight.remove(&conflict_id);

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(conflict_id = %conflict_id, error = %e, "Automatic resolution failed");
                state.counters.failed += 1;
                self.audit(
                    &mut state,
                    &tracked.conflict,
                    &tracked.context,
                    AuditAction::ResolutionFailed,
                    AuditDetails::for_conflict(&tracked.conflict)
                        .with_error(compact_text(&e.to_string())),
                );
                if let Some(current) = state.active.get_mut(&conflict_id) {
                    current.status = ConflictStatus::Detected;
                }
                ResolutionOutcome::manual(None, e.to_string())
            }
        }
    }

    fn execute(
        &self,
        state: &mut EngineState,
        conflict_id: ConflictId,
        recommendation: &ResolutionRecommendation,
        started_at: i64,
    ) -> Result<ResolutionOutcome> {
        let tracked = state
            .active
            .get_mut(&conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
        tracked.conflict.resolution_strategy = Some(recommendation.strategy);
        tracked.status = ConflictStatus::Resolving;
        let TrackedConflict {
            conflict, context, ..
        } = tracked.clone();

        state.counters.attempted += 1;
        self.audit(
            state,
            &conflict,
            &context,
            AuditAction::ResolutionAttempted,
            AuditDetails::for_conflict(&conflict).with_confidence(recommendation.confidence),
        );

        if recommendation.risk_level == RiskLevel::High
            || recommendation.confidence < self.inner.config.manual_confidence_threshold
        {
            info!(
                conflict_id = %conflict_id,
                strategy = %recommendation.strategy,
                confidence = recommendation.confidence,
                risk = %recommendation.risk_level,
                "Routing conflict to manual intervention"
            );
            let pending = self.route_to_manual(state, conflict_id, Some(recommendation.clone()))?;
            return Ok(ResolutionOutcome::manual(
                Some(pending),
                "Conflict requires manual intervention",
            ));
        }

        if let Some(resolved) = self.try_strategy(
            state,
            conflict_id,
            recommendation.strategy,
            recommendation.confidence,
            started_at,
        )? {
            return Ok(ResolutionOutcome::resolved(resolved));
        }

        self.audit(
            state,
            &conflict,
            &context,
            AuditAction::ResolutionFailed,
            AuditDetails::for_conflict(&conflict)
                .with_confidence(recommendation.confidence)
                .with_error(
                    Error::StrategyApplication(recommendation.strategy.to_string()).to_string(),
                ),
        );

        for alternative in recommendation
            .alternative_strategies
            .iter()
            .filter(|alt| alt.confidence > self.inner.config.alternative_confidence_threshold)
        {
            debug!(
                conflict_id = %conflict_id,
                strategy = %alternative.strategy,
                confidence = alternative.confidence,
                "Trying alternative strategy"
            );
            if let Some(resolved) = self.try_strategy(
                state,
                conflict_id,
                alternative.strategy,
                alternative.confidence,
                started_at,
            )? {
                return Ok(ResolutionOutcome::resolved(resolved));
            }
        }

        state.counters.failed += 1;
        let pending = self.route_to_manual(state, conflict_id, Some(recommendation.clone()))?;
        Ok(ResolutionOutcome::manual(
            Some(pending),
            "No strategy produced a resolution",
        ))
    }

    /// Apply `strategy` and, when it yields an operation, finish the
    /// resolution. `Ok(None)` means the strategy produced nothing.
    fn try_strategy(
        &self,
        state: &mut EngineState,
        conflict_id: ConflictId,
        strategy: ResolutionStrategy,
        confidence: f64,
        started_at: i64,
    ) -> Result<Option<Conflict>> {
        let tracked = state
            .active
            .get(&conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
        let Some(result_operation) = strategies::apply(strategy, &tracked.conflict.operations)
        else {
            return Ok(None);
        };

        let tracked = tracked.clone();
        let resolution = ConflictResolution {
            strategy,
            result_operation,
            confidence,
            manual_intervention_required: false,
        };
        let resolved = self.finish_resolution(state, tracked, resolution, started_at);
        state.counters.resolved_automatically += 1;

        info!(
            conflict_id = %conflict_id,
            strategy = %strategy,
            confidence,
            "Conflict resolved automatically"
        );
        Ok(Some(resolved))
    }
}

impl EngineState {
    /// Mark a conflict in flight and hand back a snapshot of it
    fn claim(&mut self, conflict_id: ConflictId) -> Result<TrackedConflict> {
        if self.in_flight.contains(&conflict_id) {
            return Err(Error::ConcurrentProcessing(conflict_id.to_string()));
        }
        let tracked = self
            .active
            .get_mut(&conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
        if tracked.conflict.is_resolved() || tracked.status.is_terminal() {
            return Err(Error::Validation(format!(
                "conflict {conflict_id} is already resolved"
            )));
        }

        tracked.status = ConflictStatus::Analyzing;
        let snapshot = tracked.clone();
        self.in_flight.insert(conflict_id);
        Ok(snapshot)
    }
}
