//! Error types for the stock ledger
//!
//! Two layers:
//! - [`StoreError`]: what a [`RecordStore`](crate::RecordStore) reports
//! - [`LedgerError`]: what callers of the decrement engine see
//!
//! ## Retryability
//!
//! | Variant | Retried internally | Caller may retry |
//! |---------|--------------------|------------------|
//! | InvalidAmount | no | no |
//! | NotFound | no | no |
//! | InsufficientQuantity | no | no |
//! | ConcurrencyConflict | yes, until exhausted | yes |
//! | Cancelled | no | no |
//! | Overflow | no | no |
//! | Storage | no | backend-specific |

use crate::types::{LedgerId, Version};
use thiserror::Error;

/// Errors reported by a record store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id
    #[error("ledger record {0} not found")]
    NotFound(LedgerId),

    /// Conditional write rejected: the stored version moved on
    #[error("version mismatch on record {id}: expected {expected}, found {actual}")]
    VersionMismatch {
        /// Record the write targeted
        id: LedgerId,
        /// Version the writer read
        expected: Version,
        /// Version currently stored
        actual: Version,
    },

    /// Backend failure unrelated to concurrency
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Amount must be a positive integer
    #[error("invalid amount {amount}: must be positive")]
    InvalidAmount {
        /// Rejected amount
        amount: u64,
    },

    /// Referenced record does not exist
    #[error("ledger record {id} not found")]
    NotFound {
        /// Missing record
        id: LedgerId,
    },

    /// Decrement would drive the quantity negative; nothing was written
    #[error("insufficient quantity on record {id}: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Record that was short
        id: LedgerId,
        /// Amount asked for
        requested: u64,
        /// Quantity on hand at the time of the check
        available: u64,
    },

    /// Every attempt lost the version race
    #[error("concurrency conflict on record {id} after {attempts} attempts")]
    ConcurrencyConflict {
        /// Contended record
        id: LedgerId,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Caller cancelled or the deadline passed before commit
    #[error("operation cancelled")]
    Cancelled,

    /// Increase would overflow the quantity
    #[error("quantity overflow on record {id}")]
    Overflow {
        /// Record that would overflow
        id: LedgerId,
    },

    /// Backend failure reported by the record store
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// Check if the caller may retry the whole operation at a higher level.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }

    /// Check if this is a business-rule rejection.
    pub fn is_insufficient(&self) -> bool {
        matches!(self, LedgerError::InsufficientQuantity { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => LedgerError::NotFound { id },
            // A bare mismatch that escaped the retry loop is still a conflict
            StoreError::VersionMismatch { id, .. } => {
                LedgerError::ConcurrencyConflict { id, attempts: 1 }
            }
            StoreError::Unavailable(msg) => LedgerError::Storage(msg),
        }
    }
}
