//! `stocktrail-events`: audit trail primitives.
//!
//! Domain mutations append one immutable record per change. The trail is
//! history only: current state lives in the mutable stores and is never
//! derived from these records.

pub mod event;
pub mod record;
pub mod recorder;

pub use event::DomainEvent;
pub use record::{EventRecord, NewEvent};
pub use recorder::{EventError, EventRecorder};
