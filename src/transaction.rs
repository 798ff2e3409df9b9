use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wallet::WalletId;

pub type TransactionId = i64;

/// How a ledger entry moved money. The lowercase form is used both on the
/// wire and in the `transactions.method` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Deposit,
    Withdraw,
    Transfer,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Deposit => "deposit",
            Method::Withdraw => "withdraw",
            Method::Transfer => "transfer",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown transaction method: {0}")]
pub struct UnknownMethod(String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Method::Deposit),
            "withdraw" => Ok(Method::Withdraw),
            "transfer" => Ok(Method::Transfer),
            other => Err(UnknownMethod(other.to_owned())),
        }
    }
}

/// One immutable record of a balance-changing event. `amount` is always the
/// positive magnitude of the movement; direction is implied by which wallet
/// fields are set (deposit has only `to`, withdraw only `from`, transfer
/// both). Entries are appended once and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub method: Method,
    pub tx_at: DateTime<Utc>,
    pub amount: Decimal,
    pub from_wallet_id: Option<WalletId>,
    pub to_wallet_id: Option<WalletId>,
}

/// A ledger entry that has not been persisted yet; the store assigns the id
/// on insert. The constructors stamp `tx_at` at the moment the use case
/// decides to record the movement and keep the wallet fields consistent with
/// the method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub method: Method,
    pub tx_at: DateTime<Utc>,
    pub amount: Decimal,
    pub from_wallet_id: Option<WalletId>,
    pub to_wallet_id: Option<WalletId>,
}

impl NewTransaction {
    pub fn deposit(to: WalletId, amount: Decimal) -> Self {
        Self {
            method: Method::Deposit,
            tx_at: Utc::now(),
            amount,
            from_wallet_id: None,
            to_wallet_id: Some(to),
        }
    }

    pub fn withdraw(from: WalletId, amount: Decimal) -> Self {
        Self {
            method: Method::Withdraw,
            tx_at: Utc::now(),
            amount,
            from_wallet_id: Some(from),
            to_wallet_id: None,
        }
    }

    pub fn transfer(from: WalletId, to: WalletId, amount: Decimal) -> Self {
        Self {
            method: Method::Transfer,
            tx_at: Utc::now(),
            amount,
            from_wallet_id: Some(from),
            to_wallet_id: Some(to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn entry_shapes() {
        let deposit = NewTransaction::deposit(1, dec("100"));
        assert_eq!(deposit.method, Method::Deposit);
        assert_eq!(deposit.from_wallet_id, None);
        assert_eq!(deposit.to_wallet_id, Some(1));

        let withdraw = NewTransaction::withdraw(1, dec("50"));
        assert_eq!(withdraw.method, Method::Withdraw);
        assert_eq!(withdraw.from_wallet_id, Some(1));
        assert_eq!(withdraw.to_wallet_id, None);

        let transfer = NewTransaction::transfer(1, 2, dec("30"));
        assert_eq!(transfer.method, Method::Transfer);
        assert_eq!(transfer.from_wallet_id, Some(1));
        assert_eq!(transfer.to_wallet_id, Some(2));
    }

    #[test]
    fn method_round_trip() {
        for method in [Method::Deposit, Method::Withdraw, Method::Transfer] {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert!("refund".parse::<Method>().is_err());
    }

    #[test]
    fn method_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Method::Deposit).unwrap(),
            r#""deposit""#
        );
    }
}
