//! Manual intervention queue and human resolution

use tracing::info;

use super::{ConflictEngine, EngineState};
use crate::error::{Error, Result};
use crate::models::{
    AuditAction, AuditDetails, Conflict, ConflictId, ConflictResolution, ConflictStatus,
    InterventionStatus, ManualInterventionRecord, NotificationId, NotificationType, Operation,
    ResolutionRecommendation, ResolutionStrategy,
};

impl ConflictEngine {
    /// Hand a tracked conflict over to a human.
    ///
    /// Pins its strategy to manual, queues it, persists an intervention
    /// request and notifies every affected user.
    pub async fn request_manual_intervention(
        &self,
        conflict_id: ConflictId,
        recommendation: Option<ResolutionRecommendation>,
    ) -> Result<Conflict> {
        let mut state = self.inner.state.lock().await;
        if state.in_flight.contains(&conflict_id) {
            return Err(Error::ConcurrentProcessing(conflict_id.to_string()));
        }
        self.route_to_manual(&mut state, conflict_id, recommendation)
    }

    pub(super) fn route_to_manual(
        &self,
        state: &mut EngineState,
        conflict_id: ConflictId,
        recommendation: Option<ResolutionRecommendation>,
    ) -> Result<Conflict> {
        let tracked = state
            .active
            .get_mut(&conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
        if tracked.status.is_terminal() {
            return Err(Error::Validation(format!(
                "conflict {conflict_id} is already {}",
                tracked.status.as_str()
            )));
        }
        tracked.conflict.resolution_strategy = Some(ResolutionStrategy::Manual);
        tracked.status = ConflictStatus::ManualPending;
        let conflict = tracked.conflict.clone();
        let context = tracked.context.clone();

        let mut details = AuditDetails::for_conflict(&conflict);
        if let Some(recommendation) = &recommendation {
            details = details.with_confidence(recommendation.confidence);
        }

        self.notify(
            state,
            &conflict,
            NotificationType::ManualInterventionRequired,
            format!(
                "Manual intervention required for {} {} conflict",
                conflict.severity, conflict.conflict_type
            ),
        );
        if !state.queue.contains(&conflict_id) {
            state.queue.push_back(conflict_id);
        }
        self.inner.outbox.intervention(ManualInterventionRecord::pending(
            conflict_id,
            recommendation,
            self.inner.clock.now_ms(),
        ));
        self.audit(
            state,
            &conflict,
            &context,
            AuditAction::ManualIntervention,
            details,
        );
        state.counters.manual_interventions += 1;

        info!(conflict_id = %conflict_id, "Manual intervention requested");
        Ok(conflict)
    }

    /// Conflicts waiting for a human decision, oldest detection first
    pub async fn pending_interventions(&self) -> Vec<Conflict> {
        let state = self.inner.state.lock().await;
        let mut pending = state
            .active
            .values()
            .filter(|tracked| tracked.status == ConflictStatus::ManualPending)
            .map(|tracked| tracked.conflict.clone())
            .collect::<Vec<_>>();
        pending.sort_by_key(|conflict| (conflict.detected_at, conflict.id));
        pending
    }

    /// Record a human decision for a conflict awaiting manual intervention
    pub async fn resolve_manually(
        &self,
        conflict_id: ConflictId,
        operation: Operation,
        resolved_by: &str,
    ) -> Result<Conflict> {
        let mut state = self.inner.state.lock().await;
        if state.in_flight.contains(&conflict_id) {
            return Err(Error::ConcurrentProcessing(conflict_id.to_string()));
        }
        let tracked = state
            .active
            .get(&conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
        if tracked.status != ConflictStatus::ManualPending {
            return Err(Error::Validation(format!(
                "conflict {conflict_id} is not awaiting manual intervention"
            )));
        }

        let mut tracked = tracked.clone();
        tracked.context.user_id = Some(resolved_by.to_string());
        let detected_at = tracked.conflict.detected_at;
        let resolution = ConflictResolution {
            strategy: ResolutionStrategy::Manual,
            result_operation: operation,
            confidence: 1.0,
            manual_intervention_required: true,
        };
        let resolved = self.finish_resolution(&mut state, tracked, resolution, detected_at);
        state.counters.resolved_manually += 1;
        self.inner
            .outbox
            .intervention_status(conflict_id, InterventionStatus::Resolved);

        info!(conflict_id = %conflict_id, resolved_by, "Conflict resolved manually");
        Ok(resolved)
    }

    /// Acknowledge a notification on behalf of one of its recipients.
    ///
    /// Returns `false` when that user had already acknowledged it.
    pub async fn acknowledge_notification(
        &self,
        notification_id: NotificationId,
        user_id: &str,
    ) -> Result<bool> {
        let mut state = self.inner.state.lock().await;
        let notification = state
            .notifications
            .get_mut(&notification_id)
            .ok_or_else(|| Error::NotFound(format!("notification {notification_id}")))?;
        if !notification.is_addressed_to(user_id) {
            return Err(Error::Validation(format!(
                "user {user_id} is not a recipient of notification {notification_id}"
            )));
        }
        Ok(notification.acknowledge(user_id))
    }
}
