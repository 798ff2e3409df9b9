/// Wallet entity: an account id plus its balance, with the sufficiency
/// check used before any debit.
pub mod wallet;

/// Ledger entries: the immutable record written for every balance change.
pub mod transaction;

/// Stable error kinds; the boundary layer maps these to response statuses.
pub mod error;

/// Storage contracts (wallet store, transaction log, atomic execution unit)
/// plus the Postgres implementation and an in-memory test double.
pub mod store;

/// The use-case layer: deposit, withdraw, transfer and the read operations,
/// enforcing invariants over the storage contracts.
pub mod ledger;

/// HTTP boundary over [`ledger::Ledger`].
pub mod server;

/// JSON config file loading for the binaries.
pub mod config;
