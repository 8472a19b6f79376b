use std::sync::Arc;

use thiserror::Error;

use stocktrail_core::EntityId;

use crate::record::{EventRecord, NewEvent};

/// Audit recorder operation error.
///
/// These are infrastructure failures; a failed append aborts the surrounding
/// domain operation (no state change without its audit record).
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event payload serialization failed: {0}")]
    Serialize(String),

    #[error("event append failed: {0}")]
    Append(String),
}

/// Append-only audit trail.
///
/// One immutable record per domain mutation. Implementations must:
/// - assign per-entity sequence numbers monotonically (no gaps, no duplicates)
/// - never mutate or delete a record once appended
/// - return history in sequence order
pub trait EventRecorder: Send + Sync {
    /// Append one audit record.
    fn record(&self, event: NewEvent) -> Result<EventRecord, EventError>;

    /// Full audit stream for one entity, in sequence order.
    fn history(&self, entity_id: EntityId) -> Result<Vec<EventRecord>, EventError>;
}

impl<R> EventRecorder for Arc<R>
where
    R: EventRecorder + ?Sized,
{
    fn record(&self, event: NewEvent) -> Result<EventRecord, EventError> {
        (**self).record(event)
    }

    fn history(&self, entity_id: EntityId) -> Result<Vec<EventRecord>, EventError> {
        (**self).history(entity_id)
    }
}
