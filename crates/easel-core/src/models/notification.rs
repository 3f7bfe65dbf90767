//! Outbound conflict notifications

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::conflict::ConflictId;

/// A unique identifier for a notification, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ConflictDetected,
    ConflictResolved,
    ManualInterventionRequired,
}

impl NotificationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConflictDetected => "conflict_detected",
            Self::ConflictResolved => "conflict_resolved",
            Self::ManualInterventionRequired => "manual_intervention_required",
        }
    }
}

/// Notification pushed to the users whose operations are involved in a
/// conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictNotification {
    pub id: NotificationId,
    pub conflict_id: ConflictId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub affected_users: Vec<String>,
    pub message: String,
    /// Creation timestamp (Unix ms)
    pub timestamp: i64,
    /// Flips to `true` on the first acknowledgement and never back
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Vec<String>,
}

impl ConflictNotification {
    #[must_use]
    pub fn new(
        conflict_id: ConflictId,
        notification_type: NotificationType,
        affected_users: Vec<String>,
        message: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            conflict_id,
            notification_type,
            affected_users,
            message: message.into(),
            timestamp,
            acknowledged: false,
            acknowledged_by: Vec::new(),
        }
    }

    pub fn is_addressed_to(&self, user_id: &str) -> bool {
        self.affected_users.iter().any(|user| user == user_id)
    }

    /// Record an acknowledgement from `user_id`.
    ///
    /// Returns `false` when that user had already acknowledged.
    pub fn acknowledge(&mut self, user_id: &str) -> bool {
        if self.acknowledged_by.iter().any(|user| user == user_id) {
            return false;
        }
        self.acknowledged_by.push(user_id.to_string());
        self.acknowledged = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_is_monotonic_and_per_user() {
        let mut notification = ConflictNotification::new(
            ConflictId::new(),
            NotificationType::ConflictResolved,
            vec!["alice".to_string(), "bob".to_string()],
            "resolved",
            1,
        );
        assert!(!notification.acknowledged);
        assert!(notification.acknowledge("alice"));
        assert!(!notification.acknowledge("alice"));
        assert!(notification.acknowledge("bob"));
        assert!(notification.acknowledged);
        assert_eq!(notification.acknowledged_by, vec!["alice", "bob"]);
    }
}
