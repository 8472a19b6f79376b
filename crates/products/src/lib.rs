//! `stocktrail-products`: product catalog and bill-of-materials domain.
//!
//! Products are thin CRUD entities; every mutation emits an audit event.
//! The ledger consults the catalog before lazily creating a balance row.

pub mod bom;
pub mod product;

pub use bom::{Bom, BomEvent, BomItem, BomItemChanged, NewBomItem};
pub use product::{
    FieldChange, Product, ProductCreated, ProductEvent, ProductStatus, ProductStatusChanged,
    ProductUpdate, ProductUpdated,
};
