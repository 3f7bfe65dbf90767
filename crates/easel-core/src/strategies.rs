//! Strategy application: turn a conflict's operations into one winning or
//! synthesized operation

use crate::models::{Operation, OperationId, ResolutionStrategy};

/// Apply `strategy` to `operations`.
///
/// Returns `None` when the strategy has no automatic rule (manual,
/// automatic) or there is nothing to resolve.
pub fn apply(strategy: ResolutionStrategy, operations: &[Operation]) -> Option<Operation> {
    match strategy {
        ResolutionStrategy::LastWriteWins => last_write_wins(operations),
        ResolutionStrategy::PriorityUser => priority_user(operations),
        ResolutionStrategy::Merge => merge(operations),
        ResolutionStrategy::Automatic | ResolutionStrategy::Manual => None,
    }
}

/// Operation with the greatest timestamp; the earliest listed wins ties
fn last_write_wins(operations: &[Operation]) -> Option<Operation> {
    operations
        .iter()
        .reduce(|latest, op| if op.timestamp > latest.timestamp { op } else { latest })
        .cloned()
}

/// Operations arrive ordered by user priority, so the first one wins
fn priority_user(operations: &[Operation]) -> Option<Operation> {
    operations.first().cloned()
}

/// Shallow merge of `data` and `style` in list order; later operations
/// overwrite earlier ones field by field
fn merge(operations: &[Operation]) -> Option<Operation> {
    let last = operations.last()?;
    let mut merged = last.clone();
    merged.id = OperationId::new();
    merged.data.clear();
    merged.style.clear();

    for op in operations {
        merged
            .data
            .extend(op.data.iter().map(|(key, value)| (key.clone(), value.clone())));
        merged
            .style
            .extend(op.style.iter().map(|(key, value)| (key.clone(), value.clone())));
        if op.bounds.is_some() {
            merged.bounds = op.bounds;
        }
        merged.timestamp = merged.timestamp.max(op.timestamp);
    }

    Some(merged)
}
