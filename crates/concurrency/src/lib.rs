//! Concurrency layer for the stock ledger
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: attempt-scoped read/write set tracking
//! - Conflict detection by read-version comparison
//! - TransactionManager: the transaction boundary with requires-new scopes
//! - CancellationToken: cooperative cancellation with deadlines

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use cancel::CancellationToken;
pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{CommitError, TransactionContext, TransactionStatus};
pub use validation::{check_version, validate_read_set, ConflictType, ValidationResult};
