use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_postgres::NoTls;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wallet_ledger::config::Config;

const MIGRATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Named migration steps, run in order. Every statement is idempotent so the
/// tool can be re-run against an already-prepared database.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "create wallet table",
        "CREATE TABLE IF NOT EXISTS wallets (
            id BIGSERIAL PRIMARY KEY,
            balance DECIMAL(20,4) NOT NULL DEFAULT 0.0000
        );",
    ),
    (
        "create transaction table",
        "CREATE TABLE IF NOT EXISTS transactions (
            id BIGSERIAL PRIMARY KEY,
            method VARCHAR(10) NOT NULL,
            tx_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
            amount DECIMAL(20,4) NOT NULL,
            from_wallet_id BIGINT,
            to_wallet_id BIGINT
        );",
    ),
    (
        "seed initial wallets",
        "INSERT INTO wallets (balance)
         SELECT 0.0000 FROM generate_series(1, 5)
         WHERE NOT EXISTS (SELECT 1 FROM wallets);",
    ),
];

#[derive(Parser)]
#[command(name = "migrate", about = "Create and seed the wallet-ledger schema")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, value_name = "FILE")]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let conf = Config::load(&cli.conf)?;

    tokio::time::timeout(MIGRATE_TIMEOUT, run_migrations(&conf.repository.migrate_dsn))
        .await
        .context("migration timed out")??;

    info!("migration completed");
    Ok(())
}

async fn run_migrations(dsn: &str) -> Result<()> {
    let (client, connection) = tokio_postgres::connect(dsn, NoTls)
        .await
        .context("failed to connect to the database")?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(error = %err, "database connection error");
        }
    });

    for (name, sql) in MIGRATIONS.iter().copied() {
        info!(step = name, "running migration");
        client
            .batch_execute(sql)
            .await
            .with_context(|| format!("migration `{name}` failed"))?;
    }
    Ok(())
}
