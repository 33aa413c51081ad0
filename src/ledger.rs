//! Main entry point for the stock ledger.
//!
//! This module provides the `Ledger` struct, which owns a record store and
//! the decrement engine that guards it.

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stockledger_concurrency::CancellationToken;
use stockledger_core::{LedgerId, LedgerRecord, RecordStore};
use stockledger_engine::{DecrementEngine, EngineConfig, Receipt};
use stockledger_storage::ShardedStore;

/// A stock ledger.
///
/// Safe to share across threads; every operation is independent and takes
/// `&self`.
///
/// # Example
///
/// ```
/// use stockledger::prelude::*;
///
/// let ledger = Ledger::in_memory();
/// let widgets = ledger.provision(1001, 10)?;
///
/// let receipt = ledger.decrease(widgets.id, 7)?;
/// assert_eq!(receipt.quantity, 3);
///
/// let err = ledger.decrease(widgets.id, 5).unwrap_err();
/// assert!(err.is_insufficient());
/// # Ok::<(), stockledger::Error>(())
/// ```
pub struct Ledger {
    engine: DecrementEngine<dyn RecordStore>,
}

impl Ledger {
    /// Create an in-memory ledger with default settings.
    pub fn in_memory() -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(ShardedStore::new());
        Self {
            engine: DecrementEngine::new(store),
        }
    }

    /// Create a builder for ledger configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use stockledger::Ledger;
    ///
    /// let ledger = Ledger::builder()
    ///     .max_attempts(10)
    ///     .serialize_per_record(true)
    ///     .open()?;
    /// # Ok::<(), stockledger::Error>(())
    /// ```
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::new()
    }

    /// Create an in-memory ledger configured from a TOML file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().config(EngineConfig::from_file(path)?).open()
    }

    /// Create a record holding `quantity` units of `product_id`.
    ///
    /// The record starts at the initial version.
    pub fn provision(&self, product_id: u64, quantity: u64) -> Result<LedgerRecord> {
        let record = self.engine.store().insert(product_id, quantity)?;
        tracing::info!(id = %record.id, product_id, quantity, "record provisioned");
        Ok(record)
    }

    /// Committed state of record `id`.
    pub fn get(&self, id: LedgerId) -> Result<LedgerRecord> {
        Ok(self.engine.read(id)?)
    }

    /// Take `amount` units from record `id`.
    ///
    /// Fails with [`Error::InsufficientQuantity`](crate::Error::InsufficientQuantity)
    /// without touching the record when not enough is on hand, and with
    /// [`Error::Conflict`](crate::Error::Conflict) when contention outlasts
    /// the retry budget.
    pub fn decrease(&self, id: LedgerId, amount: u64) -> Result<Receipt> {
        Ok(self.engine.decrease(id, amount)?)
    }

    /// [`decrease`](Self::decrease) that gives up once `cancel` fires.
    pub fn decrease_with(
        &self,
        id: LedgerId,
        amount: u64,
        cancel: &CancellationToken,
    ) -> Result<Receipt> {
        Ok(self.engine.decrease_with(id, amount, cancel)?)
    }

    /// Put `amount` units back on record `id`.
    pub fn increase(&self, id: LedgerId, amount: u64) -> Result<Receipt> {
        Ok(self.engine.increase(id, amount)?)
    }

    /// Take several amounts at once, all or nothing.
    ///
    /// Typical use is reserving every line of an order.
    pub fn reserve(&self, lines: &[(LedgerId, u64)]) -> Result<Vec<Receipt>> {
        Ok(self.engine.decrease_all(lines)?)
    }

    /// [`reserve`](Self::reserve) that gives up once `cancel` fires.
    pub fn reserve_with(
        &self,
        lines: &[(LedgerId, u64)],
        cancel: &CancellationToken,
    ) -> Result<Vec<Receipt>> {
        Ok(self.engine.decrease_all_with(lines, cancel)?)
    }

    /// Retire record `id`. Returns `false` if it did not exist.
    pub fn remove(&self, id: LedgerId) -> Result<bool> {
        let removed = self.engine.store().delete(id)?;
        if removed {
            tracing::info!(%id, "record removed");
        }
        Ok(removed)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.engine.store().len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Underlying engine, for callers that need its transaction manager.
    pub fn engine(&self) -> &DecrementEngine<dyn RecordStore> {
        &self.engine
    }

    /// Get ledger metrics.
    pub fn metrics(&self) -> LedgerMetrics {
        let txn = self.engine.transaction_metrics();
        let ops = self.engine.metrics();
        LedgerMetrics {
            transactions_committed: txn.total_committed,
            transactions_aborted: txn.total_aborted,
            commit_rate: ops.commit_rate(),
            conflicts: ops.conflicts,
            retries: ops.retries,
            rejected: ops.rejected,
            cancelled: ops.cancelled,
            exhausted: ops.exhausted,
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("records", &self.len())
            .field("engine", &self.engine)
            .finish()
    }
}

/// Ledger metrics.
#[derive(Debug, Clone)]
pub struct LedgerMetrics {
    /// Total committed transactions
    pub transactions_committed: u64,
    /// Total aborted transactions, including conflicted attempts
    pub transactions_aborted: u64,
    /// Share of finished operations that committed (0.0 - 1.0)
    pub commit_rate: f64,
    /// Attempts that lost the version race
    pub conflicts: u64,
    /// Attempts started after a conflict
    pub retries: u64,
    /// Operations refused by a business rule
    pub rejected: u64,
    /// Operations cancelled or timed out
    pub cancelled: u64,
    /// Operations that ran out of attempts
    pub exhausted: u64,
}

/// Builder for ledger configuration.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use stockledger::{Ledger, ShardedStore};
///
/// // Shared store, immediate retries, 2s per operation
/// let store = Arc::new(ShardedStore::new());
/// let ledger = Ledger::builder()
///     .store(store)
///     .no_backoff()
///     .operation_timeout(Duration::from_secs(2))
///     .open()?;
/// # Ok::<(), stockledger::Error>(())
/// ```
pub struct LedgerBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn RecordStore>>,
}

impl LedgerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `store` instead of a fresh in-memory store.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attempts per operation before reporting a conflict.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Exponential backoff between attempts.
    ///
    /// # Arguments
    ///
    /// * `initial_ms` - Delay after the first conflict
    /// * `max_ms` - Ceiling for any delay
    pub fn backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.config.backoff_initial_ms = initial_ms;
        self.config.backoff_max_ms = max_ms;
        self
    }

    /// Retry immediately after a conflict.
    pub fn no_backoff(mut self) -> Self {
        self.config.backoff_initial_ms = 0;
        self
    }

    /// Queue in-process operations on the same record instead of racing.
    pub fn serialize_per_record(mut self, enabled: bool) -> Self {
        self.config.serialize_per_record = enabled;
        self
    }

    /// Deadline for every operation.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Validate the configuration and open the ledger.
    pub fn open(self) -> Result<Ledger> {
        let store: Arc<dyn RecordStore> = match self.store {
            Some(store) => store,
            None => Arc::new(ShardedStore::new()),
        };
        let engine = DecrementEngine::with_config(store, self.config)?;
        Ok(Ledger { engine })
    }
}

impl Default for LedgerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
