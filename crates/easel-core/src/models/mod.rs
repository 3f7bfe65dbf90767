//! Data models for Easel

mod analytics;
mod audit;
mod conflict;
mod intervention;
mod notification;
mod operation;
mod recommendation;
mod strategy;

pub use analytics::{AnalyticsFilter, ConflictAnalytics, DailyTrend, TimeRange};
pub use audit::{AuditAction, AuditDetails, ConflictAuditEntry, ResolutionContext};
pub use conflict::{
    Conflict, ConflictId, ConflictResolution, ConflictStatus, ConflictType, SemanticConflict,
    Severity, SpatialOverlap,
};
pub use intervention::{InterventionStatus, ManualInterventionRecord};
pub use notification::{ConflictNotification, NotificationId, NotificationType};
pub use operation::{Bounds, Operation, OperationId, OperationKind};
pub use recommendation::{AlternativeStrategy, ResolutionRecommendation};
pub use strategy::{ResolutionStrategy, RiskLevel};
