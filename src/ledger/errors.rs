//! Ledger error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store could not be reached or the write failed. Settlement
    /// entries queue for reconciliation instead of being lost.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// The idempotency key was already recorded. Safe to treat as
    /// success on retry.
    #[error("duplicate settlement entry: {0}")]
    DuplicateEntry(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
