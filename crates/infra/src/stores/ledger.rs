use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stocktrail_core::{ExpectedRevision, LocationCode, ProductId, Revisioned};
use stocktrail_ledger::{Balance, BalanceKey, TransactionKind, TransactionRecord};

use super::{StoreError, lock_poisoned};

/// Balance table plus the append-only transaction log.
///
/// `commit` is the only write path for posted transactions: it checks every
/// supplied revision expectation and then applies all balance updates and log
/// appends, or nothing at all.
pub trait LedgerStore: Send + Sync {
    fn balance(&self, key: &BalanceKey) -> Result<Option<Balance>, StoreError>;

    /// Lazy-creation helper. Returns the stored row, which is the supplied
    /// one only if no row existed for its key (first writer wins).
    fn insert_balance_if_absent(&self, balance: Balance) -> Result<Balance, StoreError>;

    fn list_balances(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
    ) -> Result<Vec<Balance>, StoreError>;

    /// Full log for one balance, oldest first (replay order).
    fn transactions_for(&self, key: &BalanceKey) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Filtered log view, newest first (history listing order).
    fn transactions(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Atomically persist updated balances and append their log records.
    ///
    /// Every expectation is checked before anything is written; a single
    /// failed check rejects the whole commit with `Conflict`.
    fn commit(
        &self,
        balances: Vec<(ExpectedRevision, Balance)>,
        records: Vec<TransactionRecord>,
    ) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn balance(&self, key: &BalanceKey) -> Result<Option<Balance>, StoreError> {
        (**self).balance(key)
    }

    fn insert_balance_if_absent(&self, balance: Balance) -> Result<Balance, StoreError> {
        (**self).insert_balance_if_absent(balance)
    }

    fn list_balances(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
    ) -> Result<Vec<Balance>, StoreError> {
        (**self).list_balances(product_id, location)
    }

    fn transactions_for(&self, key: &BalanceKey) -> Result<Vec<TransactionRecord>, StoreError> {
        (**self).transactions_for(key)
    }

    fn transactions(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        (**self).transactions(product_id, location, kind)
    }

    fn commit(
        &self,
        balances: Vec<(ExpectedRevision, Balance)>,
        records: Vec<TransactionRecord>,
    ) -> Result<(), StoreError> {
        (**self).commit(balances, records)
    }
}

#[derive(Default)]
struct Inner {
    balances: HashMap<BalanceKey, Balance>,
    log: Vec<TransactionRecord>,
}

/// In-memory ledger store.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn balance(&self, key: &BalanceKey) -> Result<Option<Balance>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.balances.get(key).cloned())
    }

    fn insert_balance_if_absent(&self, balance: Balance) -> Result<Balance, StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let stored = inner
            .balances
            .entry(balance.key().clone())
            .or_insert(balance);
        Ok(stored.clone())
    }

    fn list_balances(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
    ) -> Result<Vec<Balance>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        let mut balances: Vec<Balance> = inner
            .balances
            .values()
            .filter(|b| product_id.is_none_or(|p| b.key().product_id == p))
            .filter(|b| location.is_none_or(|l| &b.key().location == l))
            .cloned()
            .collect();
        balances.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(balances)
    }

    fn transactions_for(&self, key: &BalanceKey) -> Result<Vec<TransactionRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .log
            .iter()
            .filter(|r| r.product_id == key.product_id && r.location == key.location)
            .cloned()
            .collect())
    }

    fn transactions(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .log
            .iter()
            .rev()
            .filter(|r| product_id.is_none_or(|p| r.product_id == p))
            .filter(|r| location.is_none_or(|l| &r.location == l))
            .filter(|r| kind.is_none_or(|k| r.kind == k))
            .cloned()
            .collect())
    }

    fn commit(
        &self,
        balances: Vec<(ExpectedRevision, Balance)>,
        records: Vec<TransactionRecord>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;

        // Check everything before writing anything.
        for (expected, balance) in &balances {
            let actual = inner
                .balances
                .get(balance.key())
                .map(|b| b.revision())
                .unwrap_or(0);
            if !expected.matches(actual) {
                return Err(StoreError::Conflict(format!(
                    "balance {} is at revision {actual}",
                    balance.key()
                )));
            }
        }

        for (_, balance) in balances {
            inner.balances.insert(balance.key().clone(), balance);
        }
        inner.log.extend(records);
        Ok(())
    }
}
