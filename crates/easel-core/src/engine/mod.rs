//! Conflict resolution engine.
//!
//! `ConflictEngine` owns every tracked conflict together with the
//! notification list, the manual intervention queue, the in-flight set and
//! the in-memory audit history. All of it sits behind one async mutex.
//! Persistence and delivery happen through the outbox, never under the lock.

mod executor;
mod intervention;
mod lifecycle;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::analyzer::ConflictAnalyzer;
use crate::analytics;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{
    AnalyticsFilter, AuditAction, AuditDetails, Conflict, ConflictAnalytics, ConflictAuditEntry,
    ConflictId, ConflictNotification, ConflictResolution, ConflictStatus, NotificationId,
    NotificationType, ResolutionContext,
};
use crate::outbox::OutboxSender;

pub use executor::ResolutionOutcome;

/// Running totals since the engine started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineCounters {
    pub submitted: u64,
    pub attempted: u64,
    pub resolved_automatically: u64,
    pub resolved_manually: u64,
    pub failed: u64,
    pub manual_interventions: u64,
    pub expired: u64,
    pub total_resolution_time_ms: i64,
}

impl EngineCounters {
    pub const fn resolved(&self) -> u64 {
        self.resolved_automatically + self.resolved_manually
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn average_resolution_time_ms(&self) -> f64 {
        match self.resolved() {
            0 => 0.0,
            n => self.total_resolution_time_ms as f64 / n as f64,
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedConflict {
    conflict: Conflict,
    context: ResolutionContext,
    status: ConflictStatus,
}

#[derive(Debug, Default)]
struct EngineState {
    active: HashMap<ConflictId, TrackedConflict>,
    notifications: HashMap<NotificationId, ConflictNotification>,
    in_flight: HashSet<ConflictId>,
    queue: VecDeque<ConflictId>,
    history: VecDeque<ConflictAuditEntry>,
    counters: EngineCounters,
}

struct EngineInner {
    config: EngineConfig,
    analyzer: ConflictAnalyzer,
    clock: Arc<dyn Clock>,
    outbox: OutboxSender,
    state: Mutex<EngineState>,
}

/// Shared handle to the engine; clones refer to the same state
#[derive(Clone)]
pub struct ConflictEngine {
    inner: Arc<EngineInner>,
}

impl ConflictEngine {
    pub fn new(config: EngineConfig, outbox: OutboxSender, clock: Arc<dyn Clock>) -> Self {
        let analyzer = ConflictAnalyzer::new(config.catalog);
        Self {
            inner: Arc::new(EngineInner {
                config,
                analyzer,
                clock,
                outbox,
                state: Mutex::new(EngineState::default()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn analyzer(&self) -> &ConflictAnalyzer {
        &self.inner.analyzer
    }

    /// Start tracking a detected conflict.
    ///
    /// Records a `conflict_detected` audit entry and notifies the authors of
    /// the involved operations.
    pub async fn submit(&self, conflict: Conflict, context: ResolutionContext) -> Result<ConflictId> {
        let mut state = self.inner.state.lock().await;
        self.track(&mut state, conflict, context)
    }

    fn track(
        &self,
        state: &mut EngineState,
        conflict: Conflict,
        context: ResolutionContext,
    ) -> Result<ConflictId> {
        if conflict.operations.is_empty() {
            return Err(Error::Validation(format!(
                "conflict {} has no operations",
                conflict.id
            )));
        }
        if conflict.is_resolved() {
            return Err(Error::Validation(format!(
                "conflict {} is already resolved",
                conflict.id
            )));
        }

        if state.active.contains_key(&conflict.id) {
            return Err(Error::Validation(format!(
                "conflict {} is already tracked",
                conflict.id
            )));
        }

        let id = conflict.id;
        let message = format!(
            "{} {} conflict detected across {} operation(s)",
            conflict.severity,
            conflict.conflict_type,
            conflict.operations.len()
        );
        self.audit(
            state,
            &conflict,
            &context,
            AuditAction::ConflictDetected,
            AuditDetails::for_conflict(&conflict),
        );
        self.notify(state, &conflict, NotificationType::ConflictDetected, message);
        state.counters.submitted += 1;
        state.active.insert(
            id,
            TrackedConflict {
                conflict,
                context,
                status: ConflictStatus::Detected,
            },
        );

        info!(conflict_id = %id, "Conflict submitted");
        Ok(id)
    }

    /// Submit a conflict and leave it for the background queue drainer
    pub async fn enqueue(&self, conflict: Conflict, context: ResolutionContext) -> Result<ConflictId> {
        let id = self.submit(conflict, context).await?;
        self.inner.state.lock().await.queue.push_back(id);
        Ok(id)
    }

    pub async fn active_conflict(&self, conflict_id: &ConflictId) -> Option<Conflict> {
        let state = self.inner.state.lock().await;
        state
            .active
            .get(conflict_id)
            .map(|tracked| tracked.conflict.clone())
    }

    pub async fn conflict_status(&self, conflict_id: &ConflictId) -> Option<ConflictStatus> {
        let state = self.inner.state.lock().await;
        state.active.get(conflict_id).map(|tracked| tracked.status)
    }

    pub async fn active_count(&self) -> usize {
        self.inner.state.lock().await.active.len()
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    pub async fn counters(&self) -> EngineCounters {
        self.inner.state.lock().await.counters
    }

    /// Notifications addressed to `user_id`, oldest first
    pub async fn notifications_for(&self, user_id: &str) -> Vec<ConflictNotification> {
        let state = self.inner.state.lock().await;
        let mut notifications = state
            .notifications
            .values()
            .filter(|notification| notification.is_addressed_to(user_id))
            .cloned()
            .collect::<Vec<_>>();
        notifications.sort_by_key(|notification| (notification.timestamp, notification.id));
        notifications
    }

    /// Snapshot of the in-memory audit history
    pub async fn history(&self) -> Vec<ConflictAuditEntry> {
        self.inner.state.lock().await.history.iter().cloned().collect()
    }

    /// Analytics over the audit history recorded by this engine instance
    pub async fn history_analytics(&self, filter: &AnalyticsFilter) -> ConflictAnalytics {
        let now = self.inner.clock.now_ms();
        let mut state = self.inner.state.lock().await;
        analytics::compute(state.history.make_contiguous(), filter, now)
    }

    fn audit(
        &self,
        state: &mut EngineState,
        conflict: &Conflict,
        context: &ResolutionContext,
        action: AuditAction,
        details: AuditDetails,
    ) {
        let entry = ConflictAuditEntry::new(
            conflict.id,
            context,
            action,
            details,
            self.inner.clock.now_ms(),
        );
        if state.history.len() >= self.inner.config.history_limit {
            state.history.pop_front();
        }
        state.history.push_back(entry.clone());
        self.inner.outbox.audit(entry);
    }

    fn notify(
        &self,
        state: &mut EngineState,
        conflict: &Conflict,
        notification_type: NotificationType,
        message: String,
    ) {
        let notification = ConflictNotification::new(
            conflict.id,
            notification_type,
            conflict.affected_users(),
            message,
            self.inner.clock.now_ms(),
        );
        state
            .notifications
            .insert(notification.id, notification.clone());
        self.inner.outbox.notify(notification);
    }

    /// Mark `tracked` resolved, remove it from the active set and emit the
    /// success audit entry and notification.
    fn finish_resolution(
        &self,
        state: &mut EngineState,
        mut tracked: TrackedConflict,
        resolution: ConflictResolution,
        started_at: i64,
    ) -> Conflict {
        let now = self.inner.clock.now_ms();
        let elapsed = now.saturating_sub(started_at).max(0);
        let strategy = resolution.strategy;
        let confidence = resolution.confidence;

        let conflict = &mut tracked.conflict;
        conflict.resolution_strategy = Some(strategy);
        conflict.resolution = Some(resolution);
        conflict.resolved_at = Some(now);
        conflict.resolution_time_ms = Some(elapsed);
        tracked.status = ConflictStatus::Resolved;

        let id = tracked.conflict.id;
        state.active.remove(&id);
        state.queue.retain(|queued| *queued != id);
        state.counters.total_resolution_time_ms =
            state.counters.total_resolution_time_ms.saturating_add(elapsed);

        self.audit(
            state,
            &tracked.conflict,
            &tracked.context,
            AuditAction::ResolutionSucceeded,
            AuditDetails::for_conflict(&tracked.conflict).with_confidence(confidence),
        );
        self.notify(
            state,
            &tracked.conflict,
            NotificationType::ConflictResolved,
            format!("Conflict resolved using {strategy}"),
        );

        tracked.conflict
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::outbox::OutboxMessage;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_submit_tracks_audits_and_notifies() {
        let mut harness = Harness::default();
        let conflict = spatial_conflict();

        let id = harness.engine.submit(conflict.clone(), context()).await.unwrap();

        assert_eq!(id, conflict.id);
        assert_eq!(harness.engine.active_count().await, 1);
        assert_eq!(
            harness.engine.conflict_status(&id).await,
            Some(ConflictStatus::Detected)
        );
        assert_eq!(harness.actions(id).await, vec![AuditAction::ConflictDetected]);

        let alice = harness.engine.notifications_for("alice").await;
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].notification_type, NotificationType::ConflictDetected);
        assert_eq!(alice[0].affected_users, vec!["alice", "bob"]);
        assert!(harness.engine.notifications_for("mallory").await.is_empty());

        let messages = harness.drain_outbox();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], OutboxMessage::Audit(_)));
        assert!(matches!(messages[1], OutboxMessage::Notification(_)));
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_and_duplicate_conflicts() {
        let harness = Harness::default();
        let mut empty = spatial_conflict();
        empty.operations.clear();

        let err = harness.engine.submit(empty, context()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let conflict = spatial_conflict();
        harness.engine.submit(conflict.clone(), context()).await.unwrap();
        let err = harness.engine.submit(conflict, context()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(harness.engine.counters().await.submitted, 1);
    }

    #[tokio::test]
    async fn test_enqueue_adds_to_queue() {
        let harness = Harness::default();
        harness
            .engine
            .enqueue(spatial_conflict(), context())
            .await
            .unwrap();
        assert_eq!(harness.engine.queue_len().await, 1);
    }

    #[tokio::test]
    async fn test_handle_conflict_counts_resolution() {
        let harness = Harness::default();
        let outcome = harness
            .engine
            .handle_conflict(spatial_conflict(), context())
            .await
            .unwrap();

        assert!(outcome.success);
        let counters = harness.engine.counters().await;
        assert_eq!(counters.submitted, 1);
        assert_eq!(counters.attempted, 1);
        assert_eq!(counters.resolved(), 1);
        assert_eq!(counters.average_resolution_time_ms(), 0.0);
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_entries() {
        let harness = Harness::new(EngineConfig {
            history_limit: 3,
            ..EngineConfig::default()
        });
        let first = harness
            .engine
            .handle_conflict(spatial_conflict(), context())
            .await
            .unwrap();
        let second = harness
            .engine
            .submit(spatial_conflict(), context())
            .await
            .unwrap();

        let history = harness.engine.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|entry| entry.action).collect::<Vec<_>>(),
            vec![
                AuditAction::ResolutionAttempted,
                AuditAction::ResolutionSucceeded,
                AuditAction::ConflictDetected,
            ]
        );
        assert_eq!(history[1].conflict_id, first.conflict.unwrap().id);
        assert_eq!(history[2].conflict_id, second);
    }

    #[test]
    fn test_counters_average() {
        let counters = EngineCounters {
            resolved_automatically: 3,
            resolved_manually: 1,
            total_resolution_time_ms: 400,
            ..EngineCounters::default()
        };
        assert_eq!(counters.average_resolution_time_ms(), 100.0);
        assert_eq!(EngineCounters::default().average_resolution_time_ms(), 0.0);
    }
}
