use thiserror::Error;

/// Stable error kinds surfaced by the ledger. The boundary layer maps these
/// to response statuses; nothing in here triggers an automatic retry.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("insufficient balance")]
    InsufficientBalance,
    /// The referenced wallet does not exist, or an optimistic balance update
    /// matched no row. The caller cannot tell the two apart without
    /// re-reading.
    #[error("record not found")]
    RecordNotFound,
    #[error("internal storage error")]
    Internal(#[source] anyhow::Error),
}

impl LedgerError {
    pub fn invalid_args(reason: impl Into<String>) -> Self {
        Self::InvalidArgs(reason.into())
    }

    pub fn internal(cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal(cause.into())
    }
}
