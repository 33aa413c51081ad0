//! Transaction manager: the transaction boundary
//!
//! Every call to [`TransactionManager::run_in_transaction`] opens a fresh,
//! independent context ("requires new"). A scope nested inside another
//! commits on its own: if the enclosing scope later fails, the inner commit
//! stands.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. begin() - allocate txn_id, open Active context
//! 2. run closure - reads pin versions, writes are buffered
//! 3. IF closure fails: abort() and return its error
//! 4. check cancellation
//! 5. validate read set (early conflict exit)
//! 6. store.commit_batch() - compare-and-bump, all or nothing
//! 7. Return closure result
//! ```
//!
//! Steps 4-6 happen inside `TransactionContext::commit`. The manager holds no
//! lock across them: atomicity of the version check comes from the store.

use crate::cancel::CancellationToken;
use crate::transaction::{CommitError, TransactionContext};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use stockledger_core::{LedgerId, RecordStore, Version};

thread_local! {
    /// Scopes currently open on this thread, for log context only
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> (Self, u32) {
        let depth = DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });
        (DepthGuard, depth)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Snapshot of transaction counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionMetrics {
    /// Transactions that committed
    pub total_committed: u64,
    /// Transactions that aborted for any reason
    pub total_aborted: u64,
    /// Committed / (committed + aborted), 0.0 when idle
    pub commit_rate: f64,
}

/// Manages transaction lifecycle and commits
///
/// Cheap to share: all state is atomic counters.
#[derive(Debug)]
pub struct TransactionManager {
    /// Next transaction ID
    next_txn_id: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        Self::with_txn_id(0)
    }

    /// Create a manager whose first transaction id is `max_txn_id + 1`
    pub fn with_txn_id(max_txn_id: u64) -> Self {
        TransactionManager {
            next_txn_id: AtomicU64::new(max_txn_id + 1),
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
        }
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Open a new context over `store`
    pub fn begin<'s, S: RecordStore + ?Sized>(&self, store: &'s S) -> TransactionContext<'s, S> {
        TransactionContext::new(self.next_txn_id(), store)
    }

    /// Commit `txn`, recording the outcome
    pub fn commit<S: RecordStore + ?Sized>(
        &self,
        txn: &mut TransactionContext<'_, S>,
    ) -> Result<Vec<(LedgerId, Version)>, CommitError> {
        match txn.commit() {
            Ok(versions) => {
                self.committed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    txn_id = txn.txn_id,
                    writes = versions.len(),
                    "transaction committed"
                );
                Ok(versions)
            }
            Err(e) => {
                self.aborted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(txn_id = txn.txn_id, error = %e, "transaction aborted at commit");
                Err(e)
            }
        }
    }

    /// Explicitly abort a transaction
    ///
    /// All buffered writes are discarded; the store never saw them.
    pub fn abort<S: RecordStore + ?Sized>(
        &self,
        txn: &mut TransactionContext<'_, S>,
        reason: impl Into<String>,
    ) -> Result<(), CommitError> {
        txn.mark_aborted(reason)?;
        self.aborted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Run `f` in a fresh transaction and commit it
    ///
    /// - `f` fails: the transaction is rolled back and `f`'s error returned
    /// - commit fails: the error is converted into `E`
    /// - otherwise: `f`'s result
    ///
    /// Always opens a new, independent scope, even when called from inside
    /// another `run_in_transaction` closure.
    pub fn run_in_transaction<S, T, E, F>(&self, store: &S, f: F) -> Result<T, E>
    where
        S: RecordStore + ?Sized,
        E: From<CommitError>,
        F: FnOnce(&mut TransactionContext<'_, S>) -> Result<T, E>,
    {
        self.run(self.begin(store), f)
    }

    /// [`run_in_transaction`](Self::run_in_transaction) that aborts once
    /// `cancel` fires
    pub fn run_in_transaction_with<S, T, E, F>(
        &self,
        store: &S,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<T, E>
    where
        S: RecordStore + ?Sized,
        E: From<CommitError>,
        F: FnOnce(&mut TransactionContext<'_, S>) -> Result<T, E>,
    {
        self.run(self.begin(store).with_cancellation(cancel.clone()), f)
    }

    fn run<S, T, E, F>(&self, mut txn: TransactionContext<'_, S>, f: F) -> Result<T, E>
    where
        S: RecordStore + ?Sized,
        E: From<CommitError>,
        F: FnOnce(&mut TransactionContext<'_, S>) -> Result<T, E>,
    {
        let (_depth_guard, depth) = DepthGuard::enter();
        tracing::trace!(txn_id = txn.txn_id, depth, "transaction started");

        match f(&mut txn) {
            Ok(value) => {
                self.commit(&mut txn)?;
                Ok(value)
            }
            Err(e) => {
                // Only a committed context refuses to abort
                let _ = self.abort(&mut txn, "rolled back by caller");
                Err(e)
            }
        }
    }

    /// Current counters
    pub fn metrics(&self) -> TransactionMetrics {
        let total_committed = self.committed.load(Ordering::Relaxed);
        let total_aborted = self.aborted.load(Ordering::Relaxed);
        let total = total_committed + total_aborted;
        TransactionMetrics {
            total_committed,
            total_aborted,
            commit_rate: if total == 0 {
                0.0
            } else {
                total_committed as f64 / total as f64
            },
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
