use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::transaction::{NewTransaction, Transaction};
use crate::wallet::{Wallet, WalletId};

pub mod memory;
pub mod pg;

/// Read and mutate wallet balances.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Fetches the current persisted state of a wallet.
    async fn get(&self, id: WalletId) -> Result<Wallet, LedgerError>;

    /// Applies `balance := balance + delta`, but only while the persisted
    /// balance still equals the value carried in `wallet`, the caller's
    /// last-read state. If no row matches (the wallet is gone or its balance
    /// has changed since the read) the update fails with
    /// [`LedgerError::RecordNotFound`]; a stale writer is never applied
    /// silently.
    ///
    /// `delta` may be negative. The store does not enforce non-negative
    /// balances; the use case checks sufficiency before calling.
    async fn update_balance(&self, wallet: &Wallet, delta: Decimal) -> Result<(), LedgerError>;
}

/// Append-only log of balance-changing events.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Appends one immutable entry. Must be called inside the same atomic
    /// unit as the balance mutation it documents.
    async fn create(&self, entry: &NewTransaction) -> Result<(), LedgerError>;

    /// Every entry where the wallet is source or destination, ascending by
    /// `tx_at`.
    async fn list_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError>;
}

/// An open transactional scope. Repository calls made through the scope are
/// invisible to other callers until [`UnitScope::commit`]; dropping the scope
/// without committing rolls every scoped effect back, which also covers the
/// caller's future being cancelled mid-unit.
#[async_trait]
pub trait UnitScope: WalletStore + TransactionLog {
    async fn commit(self) -> Result<(), LedgerError>;
}

/// Opens atomic execution units: groups of store calls that either all take
/// effect or none do.
#[async_trait]
pub trait AtomicUnit: Send + Sync {
    /// Scopes are owned handles, not borrows of the store; they stay usable
    /// across awaits and are finished by `commit` or by being dropped.
    type Scope: UnitScope + 'static;

    async fn begin(&self) -> Result<Self::Scope, LedgerError>;
}
