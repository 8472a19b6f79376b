//! Orchestration layer: composes the pure domain crates with the stores
//! and the audit recorder. All writes go through these services.

pub mod ledger;
pub mod products;
pub mod shipments;

pub use ledger::LedgerService;
pub use products::ProductService;
pub use shipments::{NewShipment, ShipmentService};
