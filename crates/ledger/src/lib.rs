//! `stocktrail-ledger`: transactional inventory ledger domain.
//!
//! A balance tracks on-hand and reserved stock for one `(product, location)`
//! pair. Every mutation goes through a typed transaction that yields the
//! updated balance plus an immutable log record; the two are committed as one
//! atomic unit by the store layer.

pub mod balance;
pub mod transaction;

pub use balance::{Balance, BalanceKey};
pub use transaction::{Reference, TransactionKind, TransactionRecord, TransactionRequest};
