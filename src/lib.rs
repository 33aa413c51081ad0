//! # stockledger
//!
//! Concurrent, conflict-detecting stock ledger.
//!
//! Each record holds a non-negative quantity and a version stamp. Callers
//! take stock with [`Ledger::decrease`]; the ledger never lets a quantity go
//! negative and never loses an update, even when many threads hit the same
//! record. Contention is resolved optimistically: an attempt that loses the
//! version race is retried from a fresh read, up to a bounded number of
//! attempts.
//!
//! ## Quick Start
//!
//! ```
//! use stockledger::prelude::*;
//!
//! let ledger = Ledger::in_memory();
//! let bolts = ledger.provision(7, 100)?;
//!
//! // Single line
//! ledger.decrease(bolts.id, 10)?;
//!
//! // Whole order, all or nothing
//! let nuts = ledger.provision(8, 50)?;
//! ledger.reserve(&[(bolts.id, 4), (nuts.id, 4)])?;
//!
//! assert_eq!(ledger.get(bolts.id)?.quantity, 86);
//! # Ok::<(), stockledger::Error>(())
//! ```
//!
//! ## Layers
//!
//! - `stockledger-core`: records, ids, versions, error taxonomy
//! - `stockledger-storage`: in-memory sharded store with conditional writes
//! - `stockledger-concurrency`: transaction boundary, conflict detection,
//!   cancellation
//! - `stockledger-engine`: retry loop, configuration, metrics

#![warn(missing_docs)]

mod error;
mod ledger;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerBuilder, LedgerMetrics};

// Re-export building blocks
pub use stockledger_concurrency::{CancellationToken, TransactionManager};
pub use stockledger_core::{LedgerId, LedgerRecord, RecordStore, Version};
pub use stockledger_engine::{EngineConfig, Receipt, RetryPolicy};
pub use stockledger_storage::ShardedStore;
