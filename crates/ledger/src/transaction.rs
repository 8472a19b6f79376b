use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stocktrail_core::{LocationCode, ProductId, UserId};

/// Typed quantity movement applied to a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Goods received: on-hand += quantity.
    Receipt,
    /// Goods issued out: on-hand -= quantity; fails if on-hand is short.
    Issue,
    /// Stock count correction: on-hand is **set** to the quantity.
    ///
    /// Unlike every other kind this is an absolute overwrite, not a delta.
    /// Replay handles it the same way, so the log still reproduces state.
    Adjustment,
    /// Outbound leg of a transfer: same arithmetic as an issue.
    TransferOut,
    /// Inbound leg of a transfer: same arithmetic as a receipt.
    TransferIn,
    /// Set stock aside for a shipment: reserved += quantity; fails if the
    /// unreserved portion is short.
    Reservation,
    /// Free previously reserved stock: reserved -= quantity.
    ReleaseReservation,
}

/// Link from a ledger entry to the operation that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Source kind, e.g. `"shipment"`.
    pub kind: String,
    pub id: Uuid,
}

impl Reference {
    pub fn shipment(id: impl Into<Uuid>) -> Self {
        Self {
            kind: "shipment".to_string(),
            id: id.into(),
        }
    }
}

/// Caller-supplied transaction input (validated input values; the boundary
/// layer has already done shape validation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub product_id: ProductId,
    pub location: LocationCode,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub reference: Option<Reference>,
    pub notes: Option<String>,
}

/// Immutable, append-only ledger entry.
///
/// `balance_after` snapshots the on-hand quantity immediately after this
/// record was applied; replaying a balance's records from zero reproduces
/// the stored balance. Created-only; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub product_id: ProductId,
    pub location: LocationCode,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub balance_after: i64,
    pub reference: Option<Reference>,
    pub notes: Option<String>,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}
