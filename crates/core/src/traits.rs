//! The record store collaborator
//!
//! The engine never owns persisted state. It reads snapshots from a
//! [`RecordStore`] and asks the store to apply conditional writes. The store
//! is responsible for making "compare version, then bump it" one indivisible
//! step with respect to every other caller.

use crate::error::StoreError;
use crate::record::LedgerRecord;
use crate::types::{LedgerId, Version};

/// One entry of a conditional batch commit
///
/// `new_quantity == None` is a version guard: the record is not written, but
/// the batch still fails unless its version equals `expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteIntent {
    /// Target record
    pub id: LedgerId,
    /// Version the transaction read
    pub expected: Version,
    /// Quantity to store, if this intent writes
    pub new_quantity: Option<u64>,
}

impl WriteIntent {
    /// Intent that writes `new_quantity` if the record is still at `expected`
    pub fn write(id: LedgerId, expected: Version, new_quantity: u64) -> Self {
        Self {
            id,
            expected,
            new_quantity: Some(new_quantity),
        }
    }

    /// Intent that only asserts the record is still at `expected`
    pub fn guard(id: LedgerId, expected: Version) -> Self {
        Self {
            id,
            expected,
            new_quantity: None,
        }
    }

    /// Whether this intent writes
    pub fn is_write(&self) -> bool {
        self.new_quantity.is_some()
    }
}

/// Durable keyed storage for ledger records
///
/// # Contract
///
/// - `read` returns the last committed state.
/// - `conditional_write` commits only if the stored version equals
///   `expected`, and bumps the version by exactly 1 when it does.
/// - `commit_batch` applies every intent or none of them; on success each
///   written record's version is bumped by exactly 1.
/// - Aborted writes are never visible to readers.
pub trait RecordStore: Send + Sync {
    /// Read the committed state of a record
    fn read(&self, id: LedgerId) -> Result<LedgerRecord, StoreError>;

    /// Write `new_quantity` if the stored version is still `expected`
    ///
    /// Returns the new version on success.
    fn conditional_write(
        &self,
        id: LedgerId,
        expected: Version,
        new_quantity: u64,
    ) -> Result<Version, StoreError>;

    /// Apply several intents atomically
    ///
    /// Returns the new version of every written record, in ascending id order.
    fn commit_batch(&self, intents: &[WriteIntent]) -> Result<Vec<(LedgerId, Version)>, StoreError>;

    /// Provision a new record at version 0
    fn insert(&self, product_id: u64, quantity: u64) -> Result<LedgerRecord, StoreError>;

    /// Remove a record; returns whether it existed
    fn delete(&self, id: LedgerId) -> Result<bool, StoreError>;

    /// Number of live records
    fn len(&self) -> usize;

    /// Whether the store holds no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    fn read(&self, id: LedgerId) -> Result<LedgerRecord, StoreError> {
        (**self).read(id)
    }

    fn conditional_write(
        &self,
        id: LedgerId,
        expected: Version,
        new_quantity: u64,
    ) -> Result<Version, StoreError> {
        (**self).conditional_write(id, expected, new_quantity)
    }

    fn commit_batch(&self, intents: &[WriteIntent]) -> Result<Vec<(LedgerId, Version)>, StoreError> {
        (**self).commit_batch(intents)
    }

    fn insert(&self, product_id: u64, quantity: u64) -> Result<LedgerRecord, StoreError> {
        (**self).insert(product_id, quantity)
    }

    fn delete(&self, id: LedgerId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
