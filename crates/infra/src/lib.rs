//! `stocktrail-infra`: stores and orchestrating services.
//!
//! Stores own persistence (in-memory here) and enforce uniqueness and
//! optimistic revision checks at commit time. Services compose the pure
//! domain crates with the stores and the audit recorder.

pub mod services;
pub mod stores;

pub use services::{LedgerService, NewShipment, ProductService, ShipmentService};
pub use stores::{
    InMemoryEventRecorder, InMemoryLedgerStore, InMemoryProductStore, InMemoryShipmentStore,
    LedgerStore, ProductStore, ShipmentStore, StoreError,
};
