//! Ledger Integration Tests
//!
//! End-to-end behavior of the `stockledger` facade: bounded decrements under
//! contention, retry exhaustion, cancellation, transaction scopes and
//! multi-record reservations.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test ledger
//!
//! # Contention tests only
//! cargo test --test ledger concurrency::
//! ```

#[path = "../common/mod.rs"]
mod common;

mod cancellation;
mod concurrency;
mod config;
mod properties;
mod reserve;
mod retry;
mod transactions;
