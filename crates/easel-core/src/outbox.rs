//! Side-effect outbox.
//!
//! The engine never awaits storage or transports while holding its state
//! lock. Audit entries, notifications and intervention records are queued
//! here and delivered by a single worker task. Delivery failures are logged
//! and dropped.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::db::ConflictStore;
use crate::models::{
    ConflictAuditEntry, ConflictId, ConflictNotification, InterventionStatus,
    ManualInterventionRecord,
};
use crate::notify::NotificationSink;

#[derive(Debug)]
pub enum OutboxMessage {
    Audit(Box<ConflictAuditEntry>),
    Notification(Box<ConflictNotification>),
    Intervention(Box<ManualInterventionRecord>),
    InterventionStatus {
        conflict_id: ConflictId,
        status: InterventionStatus,
    },
    /// Acknowledged once every earlier message has been delivered
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle used by the engine to enqueue side effects
#[derive(Debug, Clone)]
pub struct OutboxSender {
    tx: mpsc::UnboundedSender<OutboxMessage>,
}

impl OutboxSender {
    /// Create a sender and the receiver to hand to `OutboxWorker::run`
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboxMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn audit(&self, entry: ConflictAuditEntry) {
        self.send(OutboxMessage::Audit(Box::new(entry)));
    }

    pub fn notify(&self, notification: ConflictNotification) {
        self.send(OutboxMessage::Notification(Box::new(notification)));
    }

    pub fn intervention(&self, record: ManualInterventionRecord) {
        self.send(OutboxMessage::Intervention(Box::new(record)));
    }

    pub fn intervention_status(&self, conflict_id: ConflictId, status: InterventionStatus) {
        self.send(OutboxMessage::InterventionStatus {
            conflict_id,
            status,
        });
    }

    /// Wait until everything queued so far has been delivered
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(OutboxMessage::Flush(tx));
        let _ = rx.await;
    }

    fn send(&self, message: OutboxMessage) {
        if self.tx.send(message).is_err() {
            warn!("Outbox worker stopped; dropping side effect");
        }
    }
}

/// Delivers outbox messages to the store and notification sink
pub struct OutboxWorker<S, N> {
    store: S,
    sink: N,
}

impl<S, N> OutboxWorker<S, N>
where
    S: ConflictStore,
    N: NotificationSink,
{
    pub const fn new(store: S, sink: N) -> Self {
        Self { store, sink }
    }

    /// Deliver messages until every sender has been dropped
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<OutboxMessage>) {
        while let Some(message) = rx.recv().await {
            self.deliver(message).await;
        }
        debug!("Outbox drained");
    }

    async fn deliver(&self, message: OutboxMessage) {
        match message {
            OutboxMessage::Audit(entry) => {
                if let Err(e) = self.store.append_audit_entry(&entry).await {
                    warn!(
                        conflict_id = %entry.conflict_id,
                        action = %entry.action,
                        error = %e,
                        "Failed to persist audit entry"
                    );
                }
            }
            OutboxMessage::Notification(notification) => {
                if let Err(e) = self.sink.dispatch(&notification).await {
                    warn!(
                        conflict_id = %notification.conflict_id,
                        error = %e,
                        "Failed to dispatch notification"
                    );
                }
            }
            OutboxMessage::Intervention(record) => {
                if let Err(e) = self.store.save_intervention(&record).await {
                    warn!(
                        conflict_id = %record.conflict_id,
                        error = %e,
                        "Failed to persist intervention request"
                    );
                }
            }
            OutboxMessage::InterventionStatus {
                conflict_id,
                status,
            } => {
                if let Err(e) = self
                    .store
                    .update_intervention_status(&conflict_id, status)
                    .await
                {
                    warn!(
                        conflict_id = %conflict_id,
                        status = %status,
                        error = %e,
                        "Failed to update intervention status"
                    );
                }
            }
            OutboxMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
