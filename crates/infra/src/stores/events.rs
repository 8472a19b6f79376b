use std::collections::HashMap;
use std::sync::RwLock;

use stocktrail_core::EntityId;
use stocktrail_events::{EventError, EventRecord, EventRecorder, NewEvent};

/// In-memory audit recorder.
///
/// One stream per entity; sequence numbers start at 1 and never repeat.
#[derive(Default)]
pub struct InMemoryEventRecorder {
    streams: RwLock<HashMap<EntityId, Vec<EventRecord>>>,
}

impl InMemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventRecorder for InMemoryEventRecorder {
    fn record(&self, event: NewEvent) -> Result<EventRecord, EventError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventError::Append("recorder lock poisoned".to_string()))?;

        let stream = streams.entry(event.entity_id).or_default();
        let record = EventRecord {
            event_id: event.event_id,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            sequence_number: stream.len() as u64 + 1,
            event_type: event.event_type,
            schema_version: event.schema_version,
            occurred_at: event.occurred_at,
            recorded_by: event.recorded_by,
            payload: event.payload,
        };
        stream.push(record.clone());
        Ok(record)
    }

    fn history(&self, entity_id: EntityId) -> Result<Vec<EventRecord>, EventError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventError::Append("recorder lock poisoned".to_string()))?;
        Ok(streams.get(&entity_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn new_event(entity_id: EntityId, event_type: &str) -> NewEvent {
        NewEvent {
            event_id: Uuid::now_v7(),
            entity_type: "test.entity".to_string(),
            entity_id,
            event_type: event_type.to_string(),
            schema_version: 1,
            occurred_at: Utc::now(),
            recorded_by: None,
            payload: json!({ "k": "v" }),
        }
    }

    #[test]
    fn sequence_numbers_are_per_entity_and_gapless() {
        let recorder = InMemoryEventRecorder::new();
        let a = EntityId::new();
        let b = EntityId::new();

        let r1 = recorder.record(new_event(a, "a.one")).unwrap();
        let r2 = recorder.record(new_event(a, "a.two")).unwrap();
        let r3 = recorder.record(new_event(b, "b.one")).unwrap();

        assert_eq!(r1.sequence_number, 1);
        assert_eq!(r2.sequence_number, 2);
        assert_eq!(r3.sequence_number, 1);

        let history = recorder.history(a).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, "a.one");
        assert_eq!(history[1].event_type, "a.two");
    }

    #[test]
    fn history_of_unknown_entity_is_empty() {
        let recorder = InMemoryEventRecorder::new();
        assert!(recorder.history(EntityId::new()).unwrap().is_empty());
    }
}
