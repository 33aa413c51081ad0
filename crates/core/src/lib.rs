//! Core types for the stock ledger
//!
//! This crate defines the pieces every other layer builds on:
//! - [`LedgerId`] and [`Version`]: identity and optimistic-concurrency stamp
//! - [`LedgerRecord`]: the versioned quantity record
//! - [`RecordStore`]: the storage collaborator the engine reads from and
//!   conditionally writes to
//! - [`LedgerError`] and [`StoreError`]: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use error::{LedgerError, Result, StoreError};
pub use record::LedgerRecord;
pub use traits::{RecordStore, WriteIntent};
pub use types::{LedgerId, Version};
