use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LedgerError;

pub type WalletId = i64;

/// A single account with a monetary balance. Wallets are created by the
/// seeding tool and never deleted here; the ledger only reads them and moves
/// their balance, keeping it non-negative at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wallet {
    pub id: WalletId,
    pub balance: Decimal,
}

impl Wallet {
    /// Checks that the wallet can be debited by `amount`. Draining the
    /// balance to exactly zero is allowed.
    pub fn check_balance(&self, amount: Decimal) -> Result<(), LedgerError> {
        if self.balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn check_balance_sufficient() {
        let wallet = Wallet {
            id: 1,
            balance: dec("10.5"),
        };
        assert!(wallet.check_balance(dec("10")).is_ok());
    }

    #[test]
    fn check_balance_to_exactly_zero() {
        let wallet = Wallet {
            id: 1,
            balance: dec("10.5"),
        };
        assert!(wallet.check_balance(dec("10.5")).is_ok());
    }

    #[test]
    fn check_balance_insufficient() {
        let wallet = Wallet {
            id: 1,
            balance: dec("3.2222"),
        };
        let err = wallet.check_balance(dec("3.2223")).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance));
    }
}
