use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use stocktrail_core::{
    DomainError, DomainResult, ExpectedRevision, LocationCode, ProductId, Revisioned, UserId,
};
use stocktrail_ledger::{Balance, BalanceKey, TransactionKind, TransactionRecord, TransactionRequest};

use crate::stores::{LedgerStore, ProductStore};

/// How often a commit that lost an optimistic race is re-staged before the
/// conflict is surfaced to the caller.
const MAX_COMMIT_RETRIES: usize = 5;

/// Transaction processor.
///
/// Stages transactions against working copies of the affected balances,
/// then commits balance updates and log appends as one atomic store write.
/// Per-balance serialization comes from the revision check at commit time;
/// transactions on distinct balances never contend.
pub struct LedgerService<L, P> {
    store: L,
    products: P,
}

impl<L, P> LedgerService<L, P>
where
    L: LedgerStore,
    P: ProductStore,
{
    pub fn new(store: L, products: P) -> Self {
        Self { store, products }
    }

    /// Fetch a balance, lazily creating a zero row on first touch.
    ///
    /// The owning product must exist; balances are never created for unknown
    /// products. Concurrent first touches are safe: the store keeps the first
    /// inserted row and every caller gets it back.
    pub fn get_or_create_balance(&self, key: BalanceKey) -> DomainResult<Balance> {
        if let Some(balance) = self.store.balance(&key)? {
            return Ok(balance);
        }
        if !self.products.exists(key.product_id)? {
            return Err(DomainError::not_found(format!(
                "product {}",
                key.product_id
            )));
        }
        Ok(self.store.insert_balance_if_absent(Balance::opening(key))?)
    }

    /// Apply one transaction.
    pub fn submit(
        &self,
        actor: UserId,
        request: TransactionRequest,
    ) -> DomainResult<TransactionRecord> {
        let mut records = self.apply_batch(actor, std::slice::from_ref(&request))?;
        records
            .pop()
            .ok_or_else(|| DomainError::storage("batch returned no record"))
    }

    /// Apply a set of transactions all-or-nothing.
    ///
    /// Either every transaction's balance update and log record is committed,
    /// or none are. Commits that lose an optimistic race against another
    /// writer are re-staged from fresh balances a bounded number of times.
    pub fn apply_batch(
        &self,
        actor: UserId,
        requests: &[TransactionRequest],
    ) -> DomainResult<Vec<TransactionRecord>> {
        if requests.is_empty() {
            return Err(DomainError::validation("transaction batch is empty"));
        }

        let mut attempt = 0;
        loop {
            match self.try_apply(actor, requests) {
                Err(DomainError::Conflict(reason)) if attempt < MAX_COMMIT_RETRIES => {
                    attempt += 1;
                    tracing::debug!(attempt, %reason, "ledger commit lost a race, restaging");
                }
                Ok(records) => {
                    tracing::info!(
                        count = records.len(),
                        actor = %actor,
                        "ledger transactions committed"
                    );
                    return Ok(records);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn try_apply(
        &self,
        actor: UserId,
        requests: &[TransactionRequest],
    ) -> DomainResult<Vec<TransactionRecord>> {
        let now = Utc::now();

        // Working copy per touched balance, with the revision it was read at.
        let mut staged: BTreeMap<BalanceKey, (u64, Balance)> = BTreeMap::new();
        let mut records = Vec::with_capacity(requests.len());

        for request in requests {
            let key = BalanceKey::new(request.product_id, request.location.clone());
            if !staged.contains_key(&key) {
                let balance = self.get_or_create_balance(key.clone())?;
                staged.insert(key.clone(), (balance.revision(), balance));
            }
            let (_, balance) = staged
                .get_mut(&key)
                .ok_or_else(|| DomainError::storage("staged balance vanished"))?;

            let (next, record) = balance.post(request, Uuid::now_v7(), Some(actor), now)?;
            *balance = next;
            records.push(record);
        }

        let balances = staged
            .into_values()
            .map(|(read_revision, balance)| (ExpectedRevision::Exact(read_revision), balance))
            .collect();
        self.store.commit(balances, records.clone())?;
        Ok(records)
    }

    pub fn balance(&self, key: &BalanceKey) -> DomainResult<Option<Balance>> {
        Ok(self.store.balance(key)?)
    }

    pub fn balances(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
    ) -> DomainResult<Vec<Balance>> {
        Ok(self.store.list_balances(product_id, location)?)
    }

    /// Transaction history, newest first.
    pub fn transactions(
        &self,
        product_id: Option<ProductId>,
        location: Option<&LocationCode>,
        kind: Option<TransactionKind>,
    ) -> DomainResult<Vec<TransactionRecord>> {
        Ok(self.store.transactions(product_id, location, kind)?)
    }

    /// Rebuild a balance from its full log and cross-check the stored row.
    ///
    /// Surfaces a storage error if any `balance_after` snapshot diverges or
    /// if the replayed quantities disagree with the stored balance.
    pub fn verify_replay(&self, key: &BalanceKey) -> DomainResult<Balance> {
        let records = self.store.transactions_for(key)?;
        let replayed = Balance::replay(key.clone(), records.iter())?;

        if let Some(stored) = self.store.balance(key)? {
            if stored.quantity_on_hand() != replayed.quantity_on_hand()
                || stored.quantity_reserved() != replayed.quantity_reserved()
            {
                return Err(DomainError::storage(format!(
                    "balance {key} diverged from its log: stored ({}, {}), replayed ({}, {})",
                    stored.quantity_on_hand(),
                    stored.quantity_reserved(),
                    replayed.quantity_on_hand(),
                    replayed.quantity_reserved()
                )));
            }
        } else if !records.is_empty() {
            return Err(DomainError::storage(format!(
                "balance {key} has log records but no stored row"
            )));
        }

        Ok(replayed)
    }
}
