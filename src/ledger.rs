use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::store::{AtomicUnit, TransactionLog, UnitScope, WalletStore};
use crate::transaction::{NewTransaction, Transaction};
use crate::wallet::{Wallet, WalletId};

/// The balance-mutation engine. Validates input, checks sufficiency against
/// freshly-read state, and performs every balance change together with its
/// ledger entry inside one atomic unit. Conflicting concurrent writers are
/// surfaced as errors; nothing here retries.
pub struct Ledger<S> {
    store: S,
}

impl<S> Ledger<S>
where
    S: WalletStore + TransactionLog + AtomicUnit,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `amount` to the wallet balance and records a deposit entry.
    pub async fn deposit(&self, wallet_id: WalletId, amount: Decimal) -> Result<(), LedgerError> {
        check_positive(amount)?;
        let wallet = self.store.get(wallet_id).await?;

        let scope = self.store.begin().await?;
        scope.update_balance(&wallet, amount).await?;
        scope
            .create(&NewTransaction::deposit(wallet.id, amount))
            .await?;
        scope.commit().await
    }

    /// Subtracts `amount` from the wallet balance and records a withdraw
    /// entry. Fails with [`LedgerError::InsufficientBalance`] when the
    /// just-read balance cannot cover the amount.
    pub async fn withdraw(&self, wallet_id: WalletId, amount: Decimal) -> Result<(), LedgerError> {
        check_positive(amount)?;
        let wallet = self.store.get(wallet_id).await?;
        wallet.check_balance(amount)?;

        let scope = self.store.begin().await?;
        scope.update_balance(&wallet, -amount).await?;
        scope
            .create(&NewTransaction::withdraw(wallet.id, amount))
            .await?;
        scope.commit().await
    }

    /// Moves `amount` between two wallets and records a single transfer
    /// entry referencing both. Either every effect lands or none do.
    pub async fn transfer(
        &self,
        from_id: WalletId,
        to_id: WalletId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        check_positive(amount)?;
        if from_id == to_id {
            return Err(LedgerError::invalid_args(
                "cannot transfer a wallet to itself",
            ));
        }
        let from = self.store.get(from_id).await?;
        from.check_balance(amount)?;
        let to = self.store.get(to_id).await?;

        let scope = self.store.begin().await?;
        // debit and credit in ascending wallet id order, so concurrent
        // transfers acquire the two rows in a stable order
        if from.id < to.id {
            scope.update_balance(&from, -amount).await?;
            scope.update_balance(&to, amount).await?;
        } else {
            scope.update_balance(&to, amount).await?;
            scope.update_balance(&from, -amount).await?;
        }
        scope
            .create(&NewTransaction::transfer(from.id, to.id, amount))
            .await?;
        scope.commit().await
    }

    /// Current state of one wallet.
    pub async fn wallet(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError> {
        self.store.get(wallet_id).await
    }

    /// Every ledger entry where the wallet is source or destination.
    pub async fn wallet_transactions(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let wallet = self.store.get(wallet_id).await?;
        self.store.list_by_wallet(wallet.id).await
    }
}

fn check_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_args(format!(
            "amount must be positive: {amount}"
        )));
    }
    Ok(())
}
