//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). The boundary layer maps these to transport codes;
/// nothing in here is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, quantity out of bounds).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A lifecycle transition was attempted from the wrong status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An issue/transfer would drive on-hand stock negative.
    #[error("insufficient stock (on hand: {on_hand}, requested: {requested})")]
    InsufficientStock { on_hand: i64, requested: i64 },

    /// A reservation exceeds the unreserved portion of on-hand stock.
    #[error("insufficient available quantity (available: {available}, requested: {requested})")]
    InsufficientAvailable { available: i64, requested: i64 },

    /// A release exceeds the currently reserved quantity.
    #[error("cannot release more than reserved (reserved: {reserved}, requested: {requested})")]
    InvalidRelease { reserved: i64, requested: i64 },

    /// A unique identifier (shipment number, product code) collided.
    #[error("duplicate identifier: {0}")]
    Duplicate(String),

    /// An optimistic concurrency check failed (stale revision).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unexpected storage-layer failure; the whole compound operation aborts.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
