//! Decrement engine for the stock ledger
//!
//! Ties the store and the transaction boundary together:
//! - [`DecrementEngine`]: bounded decrease/increase with conflict retry
//! - [`EngineConfig`]: TOML-loadable tunables
//! - [`RetryPolicy`]: attempt bound and backoff schedule
//! - [`RecordLocks`]: optional in-process serialization per record
//! - [`EngineMetrics`]: operation counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decrement;
pub mod locks;
pub mod metrics;
pub mod retry;

pub use config::{ConfigError, EngineConfig};
pub use decrement::{DecrementEngine, Receipt};
pub use locks::{RecordGuard, RecordLocks};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use retry::RetryPolicy;
