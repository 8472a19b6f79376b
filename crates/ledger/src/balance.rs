use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stocktrail_core::{DomainError, DomainResult, LocationCode, ProductId, Revisioned, UserId};

use crate::transaction::{TransactionKind, TransactionRecord, TransactionRequest};

/// Identity of a balance: one product at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    pub product_id: ProductId,
    pub location: LocationCode,
}

impl BalanceKey {
    pub fn new(product_id: ProductId, location: LocationCode) -> Self {
        Self {
            product_id,
            location,
        }
    }
}

impl core::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.product_id, self.location)
    }
}

/// Current stock state for one product at one location.
///
/// Invariants (enforced by [`Balance::post`], checked again on replay):
/// - `quantity_on_hand >= 0`
/// - `quantity_reserved <= quantity_on_hand` for every committed state
///
/// Balances are created lazily with zero quantities on the first transaction
/// for their key, and are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    key: BalanceKey,
    quantity_on_hand: i64,
    quantity_reserved: i64,
    last_transaction_at: Option<DateTime<Utc>>,
    revision: u64,
}

impl Balance {
    /// Fresh balance with zero quantities (lazy creation).
    pub fn opening(key: BalanceKey) -> Self {
        Self {
            key,
            quantity_on_hand: 0,
            quantity_reserved: 0,
            last_transaction_at: None,
            revision: 0,
        }
    }

    pub fn key(&self) -> &BalanceKey {
        &self.key
    }

    pub fn quantity_on_hand(&self) -> i64 {
        self.quantity_on_hand
    }

    pub fn quantity_reserved(&self) -> i64 {
        self.quantity_reserved
    }

    /// On-hand minus reserved: the quantity free to reserve or issue.
    pub fn available(&self) -> i64 {
        self.quantity_on_hand - self.quantity_reserved
    }

    pub fn last_transaction_at(&self) -> Option<DateTime<Utc>> {
        self.last_transaction_at
    }

    /// Apply one typed transaction, returning the updated balance and the
    /// ledger record describing it.
    ///
    /// Pure: `self` is untouched, so a failed precondition leaves zero
    /// mutation behind. The store commits the returned pair atomically.
    pub fn post(
        &self,
        request: &TransactionRequest,
        transaction_id: Uuid,
        recorded_by: Option<UserId>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(Balance, TransactionRecord)> {
        if request.product_id != self.key.product_id || request.location != self.key.location {
            return Err(DomainError::validation(format!(
                "transaction for {}@{} posted against balance {}",
                request.product_id, request.location, self.key
            )));
        }

        let (on_hand, reserved) = step(
            self.quantity_on_hand,
            self.quantity_reserved,
            request.kind,
            request.quantity,
        )?;

        let next = Balance {
            key: self.key.clone(),
            quantity_on_hand: on_hand,
            quantity_reserved: reserved,
            last_transaction_at: Some(occurred_at),
            revision: self.revision + 1,
        };

        let record = TransactionRecord {
            transaction_id,
            product_id: request.product_id,
            location: request.location.clone(),
            kind: request.kind,
            quantity: request.quantity,
            balance_after: on_hand,
            reference: request.reference.clone(),
            notes: request.notes.clone(),
            recorded_by,
            created_at: occurred_at,
        };

        Ok((next, record))
    }

    /// Rebuild a balance from its full transaction log, oldest first.
    ///
    /// Each record's `balance_after` must equal the on-hand value right after
    /// it is applied; a mismatch means the log and the stored state have
    /// diverged and surfaces as a storage failure.
    pub fn replay<'a>(
        key: BalanceKey,
        records: impl IntoIterator<Item = &'a TransactionRecord>,
    ) -> DomainResult<Balance> {
        let mut balance = Balance::opening(key);

        for record in records {
            if record.product_id != balance.key.product_id
                || record.location != balance.key.location
            {
                return Err(DomainError::storage(format!(
                    "log record {} belongs to {}@{}, not {}",
                    record.transaction_id, record.product_id, record.location, balance.key
                )));
            }

            let (on_hand, reserved) = step(
                balance.quantity_on_hand,
                balance.quantity_reserved,
                record.kind,
                record.quantity,
            )?;

            if on_hand != record.balance_after {
                return Err(DomainError::storage(format!(
                    "transaction log replay diverged at {}: replayed on-hand {}, recorded {}",
                    record.transaction_id, on_hand, record.balance_after
                )));
            }

            balance.quantity_on_hand = on_hand;
            balance.quantity_reserved = reserved;
            balance.last_transaction_at = Some(record.created_at);
            balance.revision += 1;
        }

        Ok(balance)
    }
}

impl Revisioned for Balance {
    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Per-kind arithmetic shared by `post` and `replay`.
fn step(
    on_hand: i64,
    reserved: i64,
    kind: TransactionKind,
    quantity: i64,
) -> DomainResult<(i64, i64)> {
    match kind {
        TransactionKind::Adjustment => {
            if quantity < 0 {
                return Err(DomainError::validation(
                    "adjustment quantity cannot be negative",
                ));
            }
        }
        _ => {
            if quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
        }
    }

    match kind {
        TransactionKind::Receipt | TransactionKind::TransferIn => {
            let next = on_hand
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("on-hand quantity overflow"))?;
            Ok((next, reserved))
        }
        TransactionKind::Issue | TransactionKind::TransferOut => {
            if on_hand < quantity {
                return Err(DomainError::InsufficientStock {
                    on_hand,
                    requested: quantity,
                });
            }
            Ok((on_hand - quantity, reserved))
        }
        TransactionKind::Adjustment => Ok((quantity, reserved)),
        TransactionKind::Reservation => {
            let available = on_hand - reserved;
            if available < quantity {
                return Err(DomainError::InsufficientAvailable {
                    available,
                    requested: quantity,
                });
            }
            Ok((on_hand, reserved + quantity))
        }
        TransactionKind::ReleaseReservation => {
            if reserved < quantity {
                return Err(DomainError::InvalidRelease {
                    reserved,
                    requested: quantity,
                });
            }
            Ok((on_hand, reserved - quantity))
        }
    }
}
