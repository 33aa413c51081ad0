//! The decrement engine
//!
//! Reduces a record's quantity without ever letting it go negative, resolving
//! contention with optimistic concurrency control:
//!
//! ```text
//! Started → Read → BusinessFailure                      (terminal)
//!                ↘ WriteAttempted → Committed           (terminal)
//!                                 ↘ Conflicted → Started (retry)
//!                                              ↘ RetriesExhausted (terminal)
//! ```
//!
//! Each attempt runs in its own transaction scope and works on a transient
//! copy of the record. The business-rule check happens before the
//! conditional write, so an insufficient balance is reported at once and
//! never retried. Only version conflicts are retried.
//!
//! The engine holds no lock across attempts and is safe to share between
//! any number of threads; correctness comes from the store's conditional
//! write alone.

use crate::config::{ConfigError, EngineConfig};
use crate::locks::RecordLocks;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::retry::RetryPolicy;
use std::collections::BTreeMap;
use std::sync::Arc;
use stockledger_concurrency::{
    CancellationToken, CommitError, ConflictType, TransactionContext, TransactionManager,
    TransactionMetrics,
};
use stockledger_core::{LedgerError, LedgerId, LedgerRecord, RecordStore, Version};

/// What a committed operation left behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Record that changed
    pub id: LedgerId,
    /// Quantity after the commit
    pub quantity: u64,
    /// Version stamped by the commit
    pub version: Version,
    /// Attempts it took, including the successful one
    pub attempts: u32,
}

/// How one attempt ended, short of committing
enum AttemptError {
    /// Lost the version race; retry from a fresh read
    Conflict(ConflictType),
    /// Terminal; surface as is
    Fatal(LedgerError),
}

impl From<LedgerError> for AttemptError {
    fn from(e: LedgerError) -> Self {
        AttemptError::Fatal(e)
    }
}

impl From<CommitError> for AttemptError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::Conflict(ConflictType::Deleted { id }) => {
                AttemptError::Fatal(LedgerError::NotFound { id })
            }
            CommitError::Conflict(conflict) => AttemptError::Conflict(conflict),
            CommitError::Cancelled => AttemptError::Fatal(LedgerError::Cancelled),
            CommitError::Store(msg) => AttemptError::Fatal(LedgerError::Storage(msg)),
            CommitError::NotActive(state) => AttemptError::Fatal(LedgerError::Storage(format!(
                "transaction not active ({})",
                state
            ))),
        }
    }
}

/// Applies bounded, conflict-checked quantity changes to ledger records
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stockledger_core::{LedgerError, RecordStore};
/// use stockledger_engine::DecrementEngine;
/// use stockledger_storage::ShardedStore;
///
/// let store = Arc::new(ShardedStore::new());
/// let id = store.insert(1001, 10).unwrap().id;
/// let engine = DecrementEngine::new(store);
///
/// let receipt = engine.decrease(id, 7).unwrap();
/// assert_eq!(receipt.quantity, 3);
///
/// let err = engine.decrease(id, 5).unwrap_err();
/// assert!(matches!(err, LedgerError::InsufficientQuantity { .. }));
/// ```
pub struct DecrementEngine<S: RecordStore + ?Sized> {
    store: Arc<S>,
    manager: TransactionManager,
    config: EngineConfig,
    policy: RetryPolicy,
    locks: RecordLocks,
    metrics: EngineMetrics,
}

impl<S: RecordStore + ?Sized> DecrementEngine<S> {
    /// Engine over `store` with the default configuration
    pub fn new(store: Arc<S>) -> Self {
        Self::build(store, EngineConfig::default())
    }

    /// Engine over `store` with a validated configuration
    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<S>, config: EngineConfig) -> Self {
        tracing::debug!(
            max_attempts = config.max_attempts,
            serialize_per_record = config.serialize_per_record,
            "decrement engine created"
        );
        Self {
            store,
            manager: TransactionManager::new(),
            policy: config.retry_policy(),
            config,
            locks: RecordLocks::new(),
            metrics: EngineMetrics::default(),
        }
    }

    /// The injected store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transaction boundary used for every attempt
    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Operation counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Transaction counters
    pub fn transaction_metrics(&self) -> TransactionMetrics {
        self.manager.metrics()
    }

    /// Committed state of a record
    pub fn read(&self, id: LedgerId) -> Result<LedgerRecord, LedgerError> {
        self.store.read(id).map_err(LedgerError::from)
    }

    /// Take `amount` from record `id`
    ///
    /// # Errors
    ///
    /// - `InvalidAmount`: `amount` is zero
    /// - `NotFound`: no such record
    /// - `InsufficientQuantity`: `amount` exceeds the quantity on hand;
    ///   nothing is written
    /// - `ConcurrencyConflict`: every attempt lost the version race
    /// - `Cancelled`: the configured operation timeout passed
    pub fn decrease(&self, id: LedgerId, amount: u64) -> Result<Receipt, LedgerError> {
        self.decrease_inner(id, amount, self.token_for(None))
    }

    /// [`decrease`](Self::decrease) that gives up once `cancel` fires
    ///
    /// Cancellation observed before the commit point aborts the attempt with
    /// no partial write. A cancel that arrives after the commit does not
    /// undo it.
    pub fn decrease_with(
        &self,
        id: LedgerId,
        amount: u64,
        cancel: &CancellationToken,
    ) -> Result<Receipt, LedgerError> {
        self.decrease_inner(id, amount, self.token_for(Some(cancel)))
    }

    fn decrease_inner(
        &self,
        id: LedgerId,
        amount: u64,
        cancel: CancellationToken,
    ) -> Result<Receipt, LedgerError> {
        if amount == 0 {
            self.metrics.record_rejection();
            return Err(LedgerError::InvalidAmount { amount });
        }

        self.execute("decrease", &[id], &cancel, |txn, attempt| {
            let record = txn.read(id)?;
            tracing::debug!(
                txn_id = txn.txn_id,
                %id,
                read_version = %record.version,
                quantity = record.quantity,
                amount,
                attempt,
                "decrease attempt"
            );
            let quantity = record.decreased_by(amount)?;
            txn.write(id, quantity)?;
            Ok(Receipt {
                id,
                quantity,
                version: record.version.next(),
                attempts: attempt,
            })
        })
    }

    /// Add `amount` to record `id` (restock, returned order)
    ///
    /// Same retry behavior as [`decrease`](Self::decrease). Fails with
    /// `Overflow` if the quantity would not fit.
    pub fn increase(&self, id: LedgerId, amount: u64) -> Result<Receipt, LedgerError> {
        self.increase_with(id, amount, &CancellationToken::new())
    }

    /// [`increase`](Self::increase) that gives up once `cancel` fires
    pub fn increase_with(
        &self,
        id: LedgerId,
        amount: u64,
        cancel: &CancellationToken,
    ) -> Result<Receipt, LedgerError> {
        if amount == 0 {
            self.metrics.record_rejection();
            return Err(LedgerError::InvalidAmount { amount });
        }
        let cancel = self.token_for(Some(cancel));

        self.execute("increase", &[id], &cancel, |txn, attempt| {
            let record = txn.read(id)?;
            let quantity = record.increased_by(amount)?;
            txn.write(id, quantity)?;
            Ok(Receipt {
                id,
                quantity,
                version: record.version.next(),
                attempts: attempt,
            })
        })
    }

    /// Take several amounts in one transaction
    ///
    /// Lines naming the same record are summed. Either every line commits or
    /// none does; the first short record fails the whole call with
    /// `InsufficientQuantity`. Receipts come back in ascending id order.
    pub fn decrease_all(&self, lines: &[(LedgerId, u64)]) -> Result<Vec<Receipt>, LedgerError> {
        self.decrease_all_with(lines, &CancellationToken::new())
    }

    /// [`decrease_all`](Self::decrease_all) that gives up once `cancel` fires
    pub fn decrease_all_with(
        &self,
        lines: &[(LedgerId, u64)],
        cancel: &CancellationToken,
    ) -> Result<Vec<Receipt>, LedgerError> {
        let mut totals: BTreeMap<LedgerId, u64> = BTreeMap::new();
        for &(id, amount) in lines {
            if amount == 0 {
                self.metrics.record_rejection();
                return Err(LedgerError::InvalidAmount { amount });
            }
            // Saturating: a sum past u64::MAX can never be covered anyway
            let total = totals.entry(id).or_insert(0);
            *total = total.saturating_add(amount);
        }
        if totals.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<LedgerId> = totals.keys().copied().collect();
        let cancel = self.token_for(Some(cancel));

        self.execute("decrease_all", &ids, &cancel, |txn, attempt| {
            let mut receipts = Vec::with_capacity(totals.len());
            for (&id, &amount) in &totals {
                let record = txn.read(id)?;
                let quantity = record.decreased_by(amount)?;
                txn.write(id, quantity)?;
                receipts.push(Receipt {
                    id,
                    quantity,
                    version: record.version.next(),
                    attempts: attempt,
                });
            }
            tracing::debug!(txn_id = txn.txn_id, lines = receipts.len(), attempt, "decrease_all attempt");
            Ok(receipts)
        })
    }

    /// Combine the caller's token with the configured operation timeout
    fn token_for(&self, caller: Option<&CancellationToken>) -> CancellationToken {
        match (caller, self.config.operation_timeout()) {
            (Some(token), Some(timeout)) => token.within(timeout),
            (Some(token), None) => token.clone(),
            (None, Some(timeout)) => CancellationToken::with_timeout(timeout),
            (None, None) => CancellationToken::new(),
        }
    }

    /// Retry loop shared by every operation
    ///
    /// `attempt_fn` runs inside a fresh transaction per attempt and receives
    /// the 1-based attempt number.
    fn execute<T, F>(
        &self,
        op: &'static str,
        ids: &[LedgerId],
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<T, LedgerError>
    where
        F: FnMut(&mut TransactionContext<'_, S>, u32) -> Result<T, AttemptError>,
    {
        let _serialized = if self.config.serialize_per_record {
            match self.locks.acquire(ids, cancel) {
                Some(guard) => Some(guard),
                None => {
                    self.metrics.record_cancel();
                    return Err(LedgerError::Cancelled);
                }
            }
        } else {
            None
        };

        let mut attempt: u32 = 1;
        loop {
            if cancel.is_cancelled() {
                self.metrics.record_cancel();
                tracing::debug!(op, attempt, "operation cancelled before attempt");
                return Err(LedgerError::Cancelled);
            }

            let outcome: Result<T, AttemptError> =
                self.manager
                    .run_in_transaction_with(&*self.store, cancel, |txn| attempt_fn(txn, attempt));

            match outcome {
                Ok(value) => {
                    self.metrics.record_commit();
                    tracing::debug!(op, attempt, "operation committed");
                    return Ok(value);
                }
                Err(AttemptError::Fatal(e)) => {
                    match e {
                        LedgerError::Cancelled => self.metrics.record_cancel(),
                        LedgerError::Storage(_) => {}
                        _ => self.metrics.record_rejection(),
                    }
                    tracing::debug!(op, attempt, error = %e, "operation failed");
                    return Err(e);
                }
                Err(AttemptError::Conflict(conflict)) => {
                    self.metrics.record_conflict();
                    tracing::debug!(op, attempt, %conflict, "attempt conflicted");

                    if !self.policy.allows_retry(attempt) {
                        self.metrics.record_exhausted();
                        tracing::warn!(
                            op,
                            id = %conflict.id(),
                            attempts = attempt,
                            "retries exhausted"
                        );
                        return Err(LedgerError::ConcurrencyConflict {
                            id: conflict.id(),
                            attempts: attempt,
                        });
                    }

                    let delay = self.policy.backoff(attempt);
                    if !delay.is_zero() && cancel.sleep(delay) {
                        self.metrics.record_cancel();
                        return Err(LedgerError::Cancelled);
                    }

                    attempt += 1;
                    self.metrics.record_retry();
                }
            }
        }
    }
}

impl<S: RecordStore + ?Sized> std::fmt::Debug for DecrementEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecrementEngine")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
