use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, PoolError};
use rust_decimal::Decimal;
use tokio_postgres::{GenericClient, NoTls, Row};
use tracing::warn;

use crate::error::LedgerError;
use crate::store::{AtomicUnit, TransactionLog, UnitScope, WalletStore};
use crate::transaction::{Method, NewTransaction, Transaction};
use crate::wallet::{Wallet, WalletId};

const POOL_SIZE: usize = 16;

/// Postgres-backed store.
///
/// Balance updates are optimistic compare-and-swap statements conditioned on
/// the previously-read balance, so concurrent writers cannot lose updates;
/// the loser sees [`LedgerError::RecordNotFound`].
///
/// `balance` and `amount` live in `DECIMAL(20,4)` columns; that scale is the
/// authoritative precision, and the database rounds finer fractional digits
/// on persistence.
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Builds a connection pool from a Postgres connection string.
    pub fn connect(dsn: &str) -> Result<Self, LedgerError> {
        let config: tokio_postgres::Config = dsn.parse()?;
        let manager = Manager::from_config(config, NoTls, ManagerConfig::default());
        let pool = Pool::builder(manager)
            .max_size(POOL_SIZE)
            .build()
            .map_err(LedgerError::internal)?;
        Ok(Self { pool })
    }

    /// Round-trips a trivial query, so startup fails fast when the database
    /// is unreachable.
    pub async fn ping(&self) -> Result<(), LedgerError> {
        let client = self.pool.get().await?;
        client.batch_execute("select 1").await?;
        Ok(())
    }
}

impl From<tokio_postgres::Error> for LedgerError {
    fn from(err: tokio_postgres::Error) -> Self {
        LedgerError::internal(err)
    }
}

impl From<PoolError> for LedgerError {
    fn from(err: PoolError) -> Self {
        LedgerError::internal(err)
    }
}

fn wallet_from_row(row: &Row) -> Result<Wallet, tokio_postgres::Error> {
    Ok(Wallet {
        id: row.try_get("id")?,
        balance: row.try_get("balance")?,
    })
}

fn entry_from_row(row: &Row) -> Result<Transaction, LedgerError> {
    let method: String = row.try_get("method")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        method: method.parse::<Method>().map_err(LedgerError::internal)?,
        tx_at: row.try_get("tx_at")?,
        amount: row.try_get("amount")?,
        from_wallet_id: row.try_get("from_wallet_id")?,
        to_wallet_id: row.try_get("to_wallet_id")?,
    })
}

async fn get_wallet<C>(client: &C, id: WalletId) -> Result<Wallet, LedgerError>
where
    C: GenericClient,
{
    let row = client
        .query_opt("select id, balance from wallets where id = $1", &[&id])
        .await?
        .ok_or(LedgerError::RecordNotFound)?;
    Ok(wallet_from_row(&row)?)
}

async fn cas_update_balance<C>(
    client: &C,
    wallet: &Wallet,
    delta: Decimal,
) -> Result<(), LedgerError>
where
    C: GenericClient,
{
    let updated = client
        .execute(
            "update wallets set balance = balance + $1 where id = $2 and balance = $3",
            &[&delta, &wallet.id, &wallet.balance],
        )
        .await?;
    if updated != 1 {
        warn!(
            wallet_id = wallet.id,
            last_balance = %wallet.balance,
            %delta,
            "balance update matched no row"
        );
        return Err(LedgerError::RecordNotFound);
    }
    Ok(())
}

async fn insert_entry<C>(client: &C, entry: &NewTransaction) -> Result<(), LedgerError>
where
    C: GenericClient,
{
    client
        .execute(
            "insert into transactions (method, tx_at, amount, from_wallet_id, to_wallet_id) \
             values ($1, $2, $3, $4, $5)",
            &[
                &entry.method.as_str(),
                &entry.tx_at,
                &entry.amount,
                &entry.from_wallet_id,
                &entry.to_wallet_id,
            ],
        )
        .await?;
    Ok(())
}

async fn list_entries<C>(client: &C, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError>
where
    C: GenericClient,
{
    let rows = client
        .query(
            "select id, method, tx_at, amount, from_wallet_id, to_wallet_id \
             from transactions where from_wallet_id = $1 or to_wallet_id = $1 \
             order by tx_at, id",
            &[&wallet_id],
        )
        .await?;
    rows.iter().map(entry_from_row).collect()
}

#[async_trait]
impl WalletStore for PgStore {
    async fn get(&self, id: WalletId) -> Result<Wallet, LedgerError> {
        let client = self.pool.get().await?;
        get_wallet(&**client, id).await
    }

    async fn update_balance(&self, wallet: &Wallet, delta: Decimal) -> Result<(), LedgerError> {
        let client = self.pool.get().await?;
        cas_update_balance(&**client, wallet, delta).await
    }
}

#[async_trait]
impl TransactionLog for PgStore {
    async fn create(&self, entry: &NewTransaction) -> Result<(), LedgerError> {
        let client = self.pool.get().await?;
        insert_entry(&**client, entry).await
    }

    async fn list_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError> {
        let client = self.pool.get().await?;
        list_entries(&**client, wallet_id).await
    }
}

#[async_trait]
impl AtomicUnit for PgStore {
    type Scope = PgScope;

    async fn begin(&self) -> Result<PgScope, LedgerError> {
        let client = self.pool.get().await?;
        client.batch_execute("begin").await?;
        Ok(PgScope {
            client: Some(client),
        })
    }
}

/// Scope over one pooled connection with an open database transaction.
/// Holds the connection until [`UnitScope::commit`]; an uncommitted scope
/// rolls back on drop, before the connection goes back into the pool.
pub struct PgScope {
    client: Option<Object>,
}

impl PgScope {
    fn client(&self) -> &tokio_postgres::Client {
        match &self.client {
            Some(client) => client,
            // the connection is only taken out by commit and Drop, both of
            // which consume the scope
            None => unreachable!("atomic unit already finished"),
        }
    }
}

#[async_trait]
impl WalletStore for PgScope {
    async fn get(&self, id: WalletId) -> Result<Wallet, LedgerError> {
        get_wallet(self.client(), id).await
    }

    async fn update_balance(&self, wallet: &Wallet, delta: Decimal) -> Result<(), LedgerError> {
        cas_update_balance(self.client(), wallet, delta).await
    }
}

#[async_trait]
impl TransactionLog for PgScope {
    async fn create(&self, entry: &NewTransaction) -> Result<(), LedgerError> {
        insert_entry(self.client(), entry).await
    }

    async fn list_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError> {
        list_entries(self.client(), wallet_id).await
    }
}

#[async_trait]
impl UnitScope for PgScope {
    async fn commit(mut self) -> Result<(), LedgerError> {
        let Some(client) = self.client.take() else {
            return Err(LedgerError::internal(anyhow::anyhow!(
                "atomic unit already finished"
            )));
        };
        if let Err(err) = client.batch_execute("commit").await {
            let _ = client.batch_execute("rollback").await;
            return Err(err.into());
        }
        Ok(())
    }
}

impl Drop for PgScope {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            // abandoned mid-unit (error propagation or cancellation); the
            // rollback must complete before the connection is reused
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(err) = client.batch_execute("rollback").await {
                        warn!(error = %err, "rollback of abandoned unit failed");
                    }
                });
            }
        }
    }
}
