use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stocktrail_core::{EntityId, UserId};

use crate::event::DomainEvent;
use crate::recorder::EventError;

/// An audit event ready to be appended (not yet assigned a sequence number).
///
/// Built from a typed domain event via [`NewEvent::from_typed`], which
/// serializes the payload to JSON and captures the event metadata needed to
/// deserialize it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub entity_type: String,
    pub entity_id: EntityId,

    pub event_type: String,
    pub schema_version: u32,
    pub occurred_at: DateTime<Utc>,

    /// Actor attribution, supplied by the authentication layer.
    pub recorded_by: Option<UserId>,

    pub payload: JsonValue,
}

impl NewEvent {
    /// Wrap a typed domain event with stream metadata.
    pub fn from_typed<E>(
        entity_type: impl Into<String>,
        entity_id: EntityId,
        recorded_by: Option<UserId>,
        event: &E,
    ) -> Result<Self, EventError>
    where
        E: DomainEvent + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventError::Serialize(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id: Uuid::now_v7(),
            entity_type: entity_type.into(),
            entity_id,
            event_type: event.event_type().to_string(),
            schema_version: event.schema_version(),
            occurred_at: event.occurred_at(),
            recorded_by,
            payload,
        })
    }
}

/// A recorded audit event (assigned a per-entity sequence number).
///
/// Sequence numbers are assigned by the recorder during append and are
/// monotonically increasing per entity stream, starting at 1. Records are
/// never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub entity_type: String,
    pub entity_id: EntityId,

    /// Monotonically increasing position in the entity's audit stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub schema_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub recorded_by: Option<UserId>,

    pub payload: JsonValue,
}
