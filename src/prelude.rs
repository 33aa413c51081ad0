//! Convenient imports for the ledger.
//!
//! ```
//! use stockledger::prelude::*;
//!
//! let ledger = Ledger::in_memory();
//! let r = ledger.provision(1, 5)?;
//! ledger.decrease(r.id, 1)?;
//! # Ok::<(), stockledger::Error>(())
//! ```

// Main entry point
pub use crate::ledger::{Ledger, LedgerBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use stockledger_core::{LedgerId, LedgerRecord, Version};

// Operation types
pub use stockledger_concurrency::CancellationToken;
pub use stockledger_engine::{EngineConfig, Receipt};
