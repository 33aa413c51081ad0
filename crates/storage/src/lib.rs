//! Storage layer for the stock ledger
//!
//! This crate implements the in-memory record store:
//! - ShardedStore: DashMap of per-record slots with FxHash
//! - Conditional writes that compare and bump the version under one lock
//! - All-or-nothing batch commits across several records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;

pub use sharded::ShardedStore;
