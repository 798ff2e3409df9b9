use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::store::{AtomicUnit, TransactionLog, UnitScope, WalletStore};
use crate::transaction::{NewTransaction, Transaction, TransactionId};
use crate::wallet::{Wallet, WalletId};

/// In-memory store, used as the test double for the Postgres implementation.
/// Cloning yields a handle onto the same state.
///
/// Atomic units are implemented by snapshotting the whole state at `begin`
/// and restoring the snapshot if the scope is dropped uncommitted. That is
/// enough for tests, which run one unit at a time; it is not a concurrent
/// transaction engine.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default, Clone)]
struct Inner {
    wallets: HashMap<WalletId, Wallet>,
    entries: Vec<Transaction>,
    next_entry_id: TransactionId,
}

impl Inner {
    fn get(&self, id: WalletId) -> Result<Wallet, LedgerError> {
        self.wallets
            .get(&id)
            .cloned()
            .ok_or(LedgerError::RecordNotFound)
    }

    fn update_balance(&mut self, wallet: &Wallet, delta: Decimal) -> Result<(), LedgerError> {
        let stored = self
            .wallets
            .get_mut(&wallet.id)
            .ok_or(LedgerError::RecordNotFound)?;
        // compare-and-swap: reject the update if another writer got in
        // between the caller's read and this call
        if stored.balance != wallet.balance {
            return Err(LedgerError::RecordNotFound);
        }
        stored.balance += delta;
        Ok(())
    }

    fn create(&mut self, entry: &NewTransaction) {
        self.next_entry_id += 1;
        self.entries.push(Transaction {
            id: self.next_entry_id,
            method: entry.method,
            tx_at: entry.tx_at,
            amount: entry.amount,
            from_wallet_id: entry.from_wallet_id,
            to_wallet_id: entry.to_wallet_id,
        });
    }

    fn list_by_wallet(&self, wallet_id: WalletId) -> Vec<Transaction> {
        let mut matching: Vec<Transaction> = self
            .entries
            .iter()
            .filter(|e| {
                e.from_wallet_id == Some(wallet_id) || e.to_wallet_id == Some(wallet_id)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|e| (e.tx_at, e.id));
        matching
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wallet(&self, wallet: Wallet) {
        self.inner.lock().wallets.insert(wallet.id, wallet);
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn get(&self, id: WalletId) -> Result<Wallet, LedgerError> {
        self.inner.lock().get(id)
    }

    async fn update_balance(&self, wallet: &Wallet, delta: Decimal) -> Result<(), LedgerError> {
        self.inner.lock().update_balance(wallet, delta)
    }
}

#[async_trait]
impl TransactionLog for MemoryStore {
    async fn create(&self, entry: &NewTransaction) -> Result<(), LedgerError> {
        self.inner.lock().create(entry);
        Ok(())
    }

    async fn list_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.inner.lock().list_by_wallet(wallet_id))
    }
}

#[async_trait]
impl AtomicUnit for MemoryStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope, LedgerError> {
        let snapshot = self.inner.lock().clone();
        Ok(MemoryScope {
            inner: Arc::clone(&self.inner),
            snapshot: Some(snapshot),
        })
    }
}

/// Scope over a [`MemoryStore`]. Holds the pre-unit snapshot until commit;
/// dropping an uncommitted scope restores it.
pub struct MemoryScope {
    inner: Arc<Mutex<Inner>>,
    snapshot: Option<Inner>,
}

#[async_trait]
impl WalletStore for MemoryScope {
    async fn get(&self, id: WalletId) -> Result<Wallet, LedgerError> {
        self.inner.lock().get(id)
    }

    async fn update_balance(&self, wallet: &Wallet, delta: Decimal) -> Result<(), LedgerError> {
        self.inner.lock().update_balance(wallet, delta)
    }
}

#[async_trait]
impl TransactionLog for MemoryScope {
    async fn create(&self, entry: &NewTransaction) -> Result<(), LedgerError> {
        self.inner.lock().create(entry);
        Ok(())
    }

    async fn list_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.inner.lock().list_by_wallet(wallet_id))
    }
}

#[async_trait]
impl UnitScope for MemoryScope {
    async fn commit(mut self) -> Result<(), LedgerError> {
        self.snapshot = None;
        Ok(())
    }
}

impl Drop for MemoryScope {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.inner.lock() = snapshot;
        }
    }
}
