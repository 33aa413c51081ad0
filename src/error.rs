//! Unified error type for the ledger facade.
//!
//! Wraps the engine's [`LedgerError`] and [`ConfigError`] so callers handle a
//! single enum.

use stockledger_core::{LedgerError, LedgerId, StoreError};
use stockledger_engine::ConfigError;
use thiserror::Error;

/// All ledger errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Amount was zero
    #[error("invalid amount: {0}")]
    InvalidAmount(u64),

    /// No such record
    #[error("not found: {0}")]
    NotFound(LedgerId),

    /// Request exceeds the quantity on hand; nothing was written
    #[error("insufficient quantity on {id}: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Record that was short
        id: LedgerId,
        /// Amount asked for
        requested: u64,
        /// Quantity observed
        available: u64,
    },

    /// Every attempt lost the version race
    #[error("conflict on {id} after {attempts} attempts")]
    Conflict {
        /// Record that kept changing
        id: LedgerId,
        /// Attempts made
        attempts: u32,
    },

    /// Cancelled or timed out before the commit point
    #[error("operation cancelled")]
    Cancelled,

    /// Request is well formed but cannot be applied (quantity overflow)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Only conflicts may succeed when the whole operation is tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if the request was refused for lack of stock.
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Error::InsufficientQuantity { .. })
    }
}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidAmount { amount } => Error::InvalidAmount(amount),
            LedgerError::NotFound { id } => Error::NotFound(id),
            LedgerError::InsufficientQuantity {
                id,
                requested,
                available,
            } => Error::InsufficientQuantity {
                id,
                requested,
                available,
            },
            LedgerError::ConcurrencyConflict { id, attempts } => Error::Conflict { id, attempts },
            LedgerError::Cancelled => Error::Cancelled,
            LedgerError::Overflow { id } => {
                Error::ConstraintViolation(format!("quantity of {} would overflow", id))
            }
            LedgerError::Storage(msg) => Error::Storage(msg),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        LedgerError::from(e).into()
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Io(io_err) => Error::Io(io_err),
            other => Error::Config(other.to_string()),
        }
    }
}
