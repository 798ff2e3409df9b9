use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wallet_ledger::config::Config;
use wallet_ledger::ledger::Ledger;
use wallet_ledger::server;
use wallet_ledger::store::pg::PgStore;

#[derive(Parser)]
#[command(name = "wallet-ledger", about = "Minimal monetary ledger service")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, value_name = "FILE")]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let conf = Config::load(&cli.conf)?;

    let store =
        PgStore::connect(&conf.repository.dsn).context("failed to set up the database pool")?;
    store
        .ping()
        .await
        .context("database is not reachable")?;

    let ledger = Arc::new(Ledger::new(store));
    let app = server::router(ledger);

    let listener = TcpListener::bind(&conf.server.address)
        .await
        .with_context(|| format!("failed to bind `{}`", conf.server.address))?;
    info!(address = %conf.server.address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
