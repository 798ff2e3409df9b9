use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::store::{AtomicUnit, TransactionLog, WalletStore};
use crate::transaction::Transaction;
use crate::wallet::WalletId;

/// Builds the HTTP surface over a ledger. The wallet id in the path is the
/// acting wallet; for transfers it is the source.
pub fn router<S>(ledger: Arc<Ledger<S>>) -> Router
where
    S: WalletStore + TransactionLog + AtomicUnit + 'static,
{
    Router::new()
        .route("/wallets/{id}/balance", get(balance::<S>))
        .route("/wallets/{id}/transactions", get(transactions::<S>))
        .route("/wallets/{id}/deposit", post(deposit::<S>))
        .route("/wallets/{id}/withdraw", post(withdraw::<S>))
        .route("/wallets/{id}/transfer", post(transfer::<S>))
        .with_state(ledger)
}

#[derive(Debug, Deserialize)]
struct DepositRequest {
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct WithdrawRequest {
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    target_wallet_id: WalletId,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    balance: Decimal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Response-side wrapper that maps the error taxonomy to statuses. Client
/// mistakes keep their message; not-found and internal errors get a generic
/// body, and internal causes go to the log only.
struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            LedgerError::InvalidArgs(_) | LedgerError::InsufficientBalance => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            LedgerError::RecordNotFound => {
                (StatusCode::NOT_FOUND, "record not found".to_owned())
            }
            LedgerError::Internal(cause) => {
                error!(error = ?cause, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_owned(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn deposit<S>(
    State(ledger): State<Arc<Ledger<S>>>,
    Path(id): Path<WalletId>,
    Json(req): Json<DepositRequest>,
) -> Result<StatusCode, ApiError>
where
    S: WalletStore + TransactionLog + AtomicUnit + 'static,
{
    ledger.deposit(id, req.amount).await?;
    Ok(StatusCode::OK)
}

async fn withdraw<S>(
    State(ledger): State<Arc<Ledger<S>>>,
    Path(id): Path<WalletId>,
    Json(req): Json<WithdrawRequest>,
) -> Result<StatusCode, ApiError>
where
    S: WalletStore + TransactionLog + AtomicUnit + 'static,
{
    ledger.withdraw(id, req.amount).await?;
    Ok(StatusCode::OK)
}

async fn transfer<S>(
    State(ledger): State<Arc<Ledger<S>>>,
    Path(id): Path<WalletId>,
    Json(req): Json<TransferRequest>,
) -> Result<StatusCode, ApiError>
where
    S: WalletStore + TransactionLog + AtomicUnit + 'static,
{
    ledger.transfer(id, req.target_wallet_id, req.amount).await?;
    Ok(StatusCode::OK)
}

async fn balance<S>(
    State(ledger): State<Arc<Ledger<S>>>,
    Path(id): Path<WalletId>,
) -> Result<Json<BalanceResponse>, ApiError>
where
    S: WalletStore + TransactionLog + AtomicUnit + 'static,
{
    let wallet = ledger.wallet(id).await?;
    Ok(Json(BalanceResponse {
        balance: wallet.balance,
    }))
}

async fn transactions<S>(
    State(ledger): State<Arc<Ledger<S>>>,
    Path(id): Path<WalletId>,
) -> Result<Json<Vec<Transaction>>, ApiError>
where
    S: WalletStore + TransactionLog + AtomicUnit + 'static,
{
    Ok(Json(ledger.wallet_transactions(id).await?))
}
