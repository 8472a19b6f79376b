//! `stocktrail-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod lifecycle;
pub mod location;
pub mod revision;

pub use error::{DomainError, DomainResult};
pub use id::{EntityId, ProductId, ShipmentId, UserId};
pub use lifecycle::Lifecycle;
pub use location::LocationCode;
pub use revision::{ExpectedRevision, Revisioned};
