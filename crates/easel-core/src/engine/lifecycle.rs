//! Periodic work: queue draining and expiry

use tracing::{debug, warn};

use super::executor::ResolutionOutcome;
use super::{ConflictEngine, EngineState};
use crate::models::{ConflictId, ConflictStatus, InterventionStatus};

impl ConflictEngine {
    /// Pop the oldest queued conflict and resolve it automatically.
    ///
    /// Conflicts pinned to manual resolution leave the queue but stay
    /// tracked until a human resolves them or they expire. Returns `None`
    /// when nothing was attempted.
    pub async fn drain_once(&self) -> Option<ResolutionOutcome> {
        let next = {
            let mut state = self.inner.state.lock().await;
            let conflict_id = state.queue.pop_front()?;
            state
                .active
                .get(&conflict_id)
                .map(|tracked| (conflict_id, tracked.conflict.resolution_strategy))
        };
        let Some((conflict_id, strategy)) = next else {
            debug!("Dequeued conflict is no longer tracked");
            return None;
        };

        if !self.inner.config.automatic_resolution_enabled
            || strategy.is_some_and(|strategy| strategy.is_manual())
        {
            debug!(conflict_id = %conflict_id, "Dequeued conflict awaits manual resolution");
            return None;
        }

        let outcome = self.resolve_automatically(conflict_id).await;
        if !outcome.success {
            warn!(
                conflict_id = %conflict_id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Queued conflict was not resolved"
            );
        }
        Some(outcome)
    }

    /// Evict every unresolved conflict older than the configured timeout.
    ///
    /// Conflicts currently being resolved are left alone. Notifications
    /// about conflicts that are no longer tracked are dropped once they are
    /// older than the timeout. Returns the ids that were evicted.
    pub async fn sweep_expired(&self) -> Vec<ConflictId> {
        let now = self.inner.clock.now_ms();
        let timeout_ms = i64::try_from(self.inner.config.conflict_timeout_ms).unwrap_or(i64::MAX);
        let mut state = self.inner.state.lock().await;

        let mut expired = state
            .active
            .values()
            .filter(|tracked| {
                !tracked.conflict.is_resolved()
                    && !state.in_flight.contains(&tracked.conflict.id)
                    && now.saturating_sub(tracked.conflict.detected_at) > timeout_ms
            })
            .map(|tracked| tracked.conflict.id)
            .collect::<Vec<_>>();
        expired.sort();

        for conflict_id in &expired {
            let Some(tracked) = state.active.remove(conflict_id) else {
                continue;
            };
            warn!(
                conflict_id = %conflict_id,
                status = tracked.status.as_str(),
                age_ms = now.saturating_sub(tracked.conflict.detected_at),
                "Conflict expired without resolution"
            );
            state.queue.retain(|queued| queued != conflict_id);
            if tracked.status == ConflictStatus::ManualPending {
                self.inner
                    .outbox
                    .intervention_status(*conflict_id, InterventionStatus::Expired);
            }
        }
        state.counters.expired += expired.len() as u64;

        let EngineState {
            active,
            notifications,
            ..
        } = &mut *state;
        notifications.retain(|_, notification| {
            active.contains_key(&notification.conflict_id)
                || now.saturating_sub(notification.timestamp) <= timeout_ms
        });

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::config::EngineConfig;
    use crate::models::{ConflictStatus, InterventionStatus, ResolutionStrategy};
    use crate::outbox::OutboxMessage;
    use pretty_assertions::assert_eq;

    fn expired_statuses(messages: &[OutboxMessage]) -> Vec<crate::models::ConflictId> {
        messages
            .iter()
            .filter_map(|message| match message {
                OutboxMessage::InterventionStatus {
                    conflict_id,
                    status: InterventionStatus::Expired,
                } => Some(*conflict_id),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_drain_once_resolves_in_fifo_order() {
        let harness = Harness::default();
        let first = harness
            .engine
            .enqueue(spatial_conflict(), context())
            .await
            .unwrap();
        let second = harness
            .engine
            .enqueue(spatial_conflict(), context())
            .await
            .unwrap();

        let outcome = harness.engine.drain_once().await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.conflict.unwrap().id, first);
        assert_eq!(harness.engine.queue_len().await, 1);
        assert!(harness.engine.active_conflict(&second).await.is_some());

        let outcome = harness.engine.drain_once().await.unwrap();
        assert_eq!(outcome.conflict.unwrap().id, second);
        assert!(harness.engine.drain_once().await.is_none());
    }

    #[tokio::test]
    async fn test_drain_once_skips_manual_conflicts() {
        let harness = Harness::default();
        let id = harness
            .engine
            .submit(critical_conflict(), context())
            .await
            .unwrap();
        harness.engine.resolve_automatically(id).await;
        assert_eq!(harness.engine.queue_len().await, 1);

        assert!(harness.engine.drain_once().await.is_none());

        assert_eq!(harness.engine.queue_len().await, 0);
        let pending = harness.engine.active_conflict(&id).await.unwrap();
        assert_eq!(pending.resolution_strategy, Some(ResolutionStrategy::Manual));
        assert_eq!(
            harness.engine.conflict_status(&id).await,
            Some(ConflictStatus::ManualPending)
        );
    }

    #[tokio::test]
    async fn test_drain_once_respects_disabled_automatic_resolution() {
        let harness = Harness::new(EngineConfig {
            automatic_resolution_enabled: false,
            ..EngineConfig::default()
        });
        let id = harness
            .engine
            .enqueue(spatial_conflict(), context())
            .await
            .unwrap();

        assert!(harness.engine.drain_once().await.is_none());
        assert!(harness.engine.active_conflict(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_conflicts_permanently() {
        let harness = Harness::default();
        let old = harness
            .engine
            .enqueue(spatial_conflict(), context())
            .await
            .unwrap();
        harness.clock.advance_ms(200_000);
        let mut fresh_conflict = spatial_conflict();
        fresh_conflict.detected_at = START_MS + 200_000;
        let fresh = harness
            .engine
            .submit(fresh_conflict, context())
            .await
            .unwrap();

        harness.clock.advance_ms(100_001);
        let expired = harness.engine.sweep_expired().await;

        assert_eq!(expired, vec![old]);
        assert_eq!(harness.engine.active_conflict(&old).await, None);
        assert!(harness.engine.active_conflict(&fresh).await.is_some());
        assert_eq!(harness.engine.queue_len().await, 0);
        assert_eq!(harness.engine.counters().await.expired, 1);

        let retry = harness.engine.resolve_automatically(old).await;
        assert!(!retry.success);
        assert!(harness.engine.sweep_expired().await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_keeps_conflict_at_exact_timeout() {
        let harness = Harness::default();
        let id = harness
            .engine
            .submit(spatial_conflict(), context())
            .await
            .unwrap();
        harness.clock.advance_ms(300_000);

        assert!(harness.engine.sweep_expired().await.is_empty());
        assert!(harness.engine.active_conflict(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_skips_in_flight_conflicts() {
        let harness = Harness::default();
        let id = harness
            .engine
            .submit(spatial_conflict(), context())
            .await
            .unwrap();
        harness.engine.inner.state.lock().await.in_flight.insert(id);
        harness.clock.advance_ms(400_000);

        assert!(harness.engine.sweep_expired().await.is_empty());
        assert!(harness.engine.active_conflict(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_handles_extreme_detection_times() {
        let harness = Harness::default();
        let mut ancient = spatial_conflict();
        ancient.detected_at = i64::MIN;
        let ancient = harness.engine.submit(ancient, context()).await.unwrap();
        let mut future = spatial_conflict();
        future.detected_at = i64::MAX;
        let future = harness.engine.submit(future, context()).await.unwrap();

        assert_eq!(harness.engine.sweep_expired().await, vec![ancient]);
        assert!(harness.engine.active_conflict(&future).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_marks_only_manual_conflicts_expired() {
        let mut harness = Harness::default();
        let detected = harness
            .engine
            .submit(spatial_conflict(), context())
            .await
            .unwrap();
        let pending = harness
            .engine
            .submit(critical_conflict(), context())
            .await
            .unwrap();
        harness.engine.resolve_automatically(pending).await;
        harness.drain_outbox();

        harness.clock.advance_ms(300_001);
        let mut expired = harness.engine.sweep_expired().await;
        expired.sort();
        let mut expected = vec![detected, pending];
        expected.sort();
        assert_eq!(expired, expected);

        assert_eq!(expired_statuses(&harness.drain_outbox()), vec![pending]);
    }

    #[tokio::test]
    async fn test_sweep_prunes_notifications_of_finished_conflicts() {
        let harness = Harness::default();
        harness
            .engine
            .handle_conflict(spatial_conflict(), context())
            .await
            .unwrap();
        let tracked = harness
            .engine
            .submit(critical_conflict(), context())
            .await
            .unwrap();
        assert_eq!(harness.engine.notifications_for("alice").await.len(), 3);

        harness.clock.advance_ms(300_000);
        harness.engine.sweep_expired().await;
        assert_eq!(harness.engine.notifications_for("alice").await.len(), 3);

        harness.clock.advance_ms(1);
        let mut fresh = spatial_conflict();
        fresh.detected_at = START_MS + 300_001;
        harness.engine.submit(fresh, context()).await.unwrap();
        harness.engine.sweep_expired().await;

        let remaining = harness.engine.notifications_for("alice").await;
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].conflict_id, tracked);
    }
}
