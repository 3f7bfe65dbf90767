//! Notification delivery

use std::future::Future;

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::Result;
use crate::models::ConflictNotification;

const DEFAULT_CAPACITY: usize = 256;

/// Destination for conflict notifications
pub trait NotificationSink: Send + Sync {
    fn dispatch(
        &self,
        notification: &ConflictNotification,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Fans notifications out to every subscribed transport
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ConflictNotification>,
}

impl BroadcastNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConflictNotification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationSink for BroadcastNotifier {
    async fn dispatch(&self, notification: &ConflictNotification) -> Result<()> {
        match self.tx.send(notification.clone()) {
            Ok(receivers) => {
                debug!(
                    notification_id = %notification.id,
                    receivers,
                    "Notification dispatched"
                );
            }
            Err(_) => {
                debug!(
                    notification_id = %notification.id,
                    "No subscribers for notification"
                );
            }
        }
        Ok(())
    }
}
