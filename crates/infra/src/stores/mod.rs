//! Persistence seams and their in-memory implementations.
//!
//! Every store guards its state behind one `RwLock` and performs its
//! uniqueness and revision checks under the write lock, so a successful
//! commit is atomic with respect to concurrent callers.

pub mod events;
pub mod ledger;
pub mod products;
pub mod shipments;

pub use events::InMemoryEventRecorder;
pub use ledger::{InMemoryLedgerStore, LedgerStore};
pub use products::{InMemoryProductStore, ProductStore};
pub use shipments::{InMemoryShipmentStore, ShipmentStore};

use stocktrail_core::DomainError;
use thiserror::Error;

/// Store operation failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic revision check failed; the row changed since it was read.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A uniqueness constraint would be violated.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Backend failure; the surrounding operation must abort.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::Duplicate(msg) => DomainError::Duplicate(msg),
            StoreError::Storage(msg) => DomainError::Storage(msg),
        }
    }
}

/// Shorthand for the poisoned-lock branch of `RwLock` accessors.
pub(crate) fn lock_poisoned() -> StoreError {
    StoreError::Storage("store lock poisoned".to_string())
}
