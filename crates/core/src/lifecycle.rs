//! Pure decision/evolution split for lifecycle-managed entities.

use crate::revision::Revisioned;

/// Lifecycle execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` validates a transition and
///   returns the events describing it.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Implementations must not perform IO or side effects; orchestration
/// (persistence, ledger movements, audit recording) belongs to services.
pub trait Lifecycle: Revisioned {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Deterministic; bumps the revision by one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events a command produces given the current state.
    ///
    /// Must not mutate state. A failed `handle` leaves the entity untouched.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
