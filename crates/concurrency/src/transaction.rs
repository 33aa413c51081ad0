//! Attempt-scoped transaction context
//!
//! A [`TransactionContext`] buffers everything a single attempt does:
//! - Read set: the snapshot of each record at first read (its read version)
//! - Write set: new quantities, invisible to anyone until commit
//!
//! Reads are repeatable within the context and see the context's own
//! buffered writes. Nothing touches the store until commit, so dropping or
//! aborting the context discards the attempt without a trace.
//!
//! ## Commit
//!
//! ```text
//! Active → Validating → Committed
//!                     ↘ Aborted (conflict, deleted record, cancellation)
//! ```

use crate::cancel::CancellationToken;
use crate::validation::{validate_read_set, ConflictType};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use stockledger_core::{LedgerId, LedgerRecord, RecordStore, StoreError, Version, WriteIntent};
use thiserror::Error;

/// Lifecycle state of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Commit in progress
    Validating,
    /// Writes applied to the store
    Committed,
    /// Discarded; nothing was applied
    Aborted {
        /// Human-readable reason
        reason: String,
    },
}

/// Why a commit (or an operation on a finished context) failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// Version check failed; the attempt must be retried from a fresh read
    #[error("conflict: {0}")]
    Conflict(ConflictType),

    /// Cancellation observed before the commit point
    #[error("transaction cancelled before commit")]
    Cancelled,

    /// Store failure unrelated to concurrency
    #[error("store error: {0}")]
    Store(String),

    /// Context is not in the Active state
    #[error("transaction not active ({0})")]
    NotActive(String),
}

impl From<StoreError> for CommitError {
    fn from(e: StoreError) -> Self {
        match ConflictType::from_store_error(&e) {
            Some(conflict) => CommitError::Conflict(conflict),
            None => CommitError::Store(e.to_string()),
        }
    }
}

/// Read/write set of one transaction attempt
pub struct TransactionContext<'s, S: RecordStore + ?Sized> {
    /// Unique id, for logs
    pub txn_id: u64,
    /// Current state
    pub status: TransactionStatus,
    store: &'s S,
    read_set: FxHashMap<LedgerId, LedgerRecord>,
    write_set: BTreeMap<LedgerId, u64>,
    cancel: Option<CancellationToken>,
}

impl<'s, S: RecordStore + ?Sized> TransactionContext<'s, S> {
    /// Open an empty, active context over `store`
    pub fn new(txn_id: u64, store: &'s S) -> Self {
        Self {
            txn_id,
            status: TransactionStatus::Active,
            store,
            read_set: FxHashMap::default(),
            write_set: BTreeMap::new(),
            cancel: None,
        }
    }

    /// Attach a cancellation token checked before each read and at commit
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether reads and writes are still accepted
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Whether the attempt has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |t| t.is_cancelled())
    }

    fn ensure_active(&self) -> Result<(), CommitError> {
        match &self.status {
            TransactionStatus::Active => Ok(()),
            other => Err(CommitError::NotActive(format!("{:?}", other))),
        }
    }

    /// Read a record as this transaction sees it
    ///
    /// The first read of an id fetches from the store and pins the read
    /// version. Later reads return the pinned snapshot with any buffered
    /// write applied.
    pub fn read(&mut self, id: LedgerId) -> Result<LedgerRecord, CommitError> {
        self.ensure_active()?;
        if self.is_cancelled() {
            return Err(CommitError::Cancelled);
        }

        let snapshot = match self.read_set.get(&id) {
            Some(record) => record.clone(),
            None => {
                let record = self.store.read(id).map_err(CommitError::from)?;
                self.read_set.insert(id, record.clone());
                record
            }
        };

        Ok(match self.write_set.get(&id) {
            Some(&quantity) => LedgerRecord {
                quantity,
                ..snapshot
            },
            None => snapshot,
        })
    }

    /// Buffer a new quantity for `id`
    ///
    /// Reads the record first if this transaction has not, so the write is
    /// always conditioned on a read version.
    pub fn write(&mut self, id: LedgerId, quantity: u64) -> Result<(), CommitError> {
        self.ensure_active()?;
        if !self.read_set.contains_key(&id) {
            self.read(id)?;
        }
        self.write_set.insert(id, quantity);
        Ok(())
    }

    /// Version pinned by the first read of `id`
    pub fn read_version(&self, id: LedgerId) -> Option<Version> {
        self.read_set.get(&id).map(|r| r.version)
    }

    /// Number of records read
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of records with buffered writes
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Whether nothing was written
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty()
    }

    /// Intents for the store: writes for the write set, version guards for
    /// records that were only read
    pub fn intents(&self) -> Vec<WriteIntent> {
        let mut intents: Vec<WriteIntent> = self
            .read_set
            .values()
            .map(|record| match self.write_set.get(&record.id) {
                Some(&quantity) => WriteIntent::write(record.id, record.version, quantity),
                None => WriteIntent::guard(record.id, record.version),
            })
            .collect();
        intents.sort_by_key(|intent| intent.id);
        intents
    }

    /// Validate and apply this transaction
    ///
    /// Returns the new version of every written record. On any failure the
    /// context ends Aborted and the store is untouched.
    pub fn commit(&mut self) -> Result<Vec<(LedgerId, Version)>, CommitError> {
        self.ensure_active()?;
        self.status = TransactionStatus::Validating;

        if self.is_cancelled() {
            self.status = TransactionStatus::Aborted {
                reason: "cancelled".to_string(),
            };
            return Err(CommitError::Cancelled);
        }

        if self.read_set.is_empty() {
            self.status = TransactionStatus::Committed;
            return Ok(Vec::new());
        }

        // Cheap early exit; the batch commit below is authoritative
        let early = validate_read_set(
            self.read_set.values().map(|r| (r.id, r.version)),
            self.store,
        );
        if let Some(conflict) = early.first() {
            self.status = TransactionStatus::Aborted {
                reason: conflict.to_string(),
            };
            return Err(CommitError::Conflict(conflict));
        }

        match self.store.commit_batch(&self.intents()) {
            Ok(versions) => {
                self.status = TransactionStatus::Committed;
                Ok(versions)
            }
            Err(e) => {
                let err = CommitError::from(e);
                self.status = TransactionStatus::Aborted {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }

    /// Discard the transaction
    pub fn mark_aborted(&mut self, reason: impl Into<String>) -> Result<(), CommitError> {
        match self.status {
            TransactionStatus::Committed => Err(CommitError::NotActive("Committed".to_string())),
            _ => {
                self.status = TransactionStatus::Aborted {
                    reason: reason.into(),
                };
                self.write_set.clear();
                Ok(())
            }
        }
    }
}

impl<S: RecordStore + ?Sized> std::fmt::Debug for TransactionContext<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("status", &self.status)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .finish()
    }
}
