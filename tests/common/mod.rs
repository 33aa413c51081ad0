//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use stockledger::{Ledger, LedgerId, ShardedStore};
use stockledger_core::{LedgerRecord, RecordStore, StoreError, Version, WriteIntent};

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Ledger with a single record of `quantity`
pub fn ledger_with(quantity: u64) -> (Ledger, LedgerId) {
    init_tracing();
    let ledger = Ledger::in_memory();
    let id = ledger
        .provision(1, quantity)
        .expect("Failed to provision record")
        .id;
    (ledger, id)
}

/// Store where a simulated writer beats the first `steal` commits
///
/// Each stolen commit rewrites the target record with its own quantity, so
/// the version moves but the balance does not.
pub struct ContendedStore {
    inner: ShardedStore,
    steal: AtomicU32,
}

impl ContendedStore {
    pub fn new(steal: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: ShardedStore::new(),
            steal: AtomicU32::new(steal),
        })
    }

    /// Contention that never lets up
    pub fn always() -> Arc<Self> {
        Self::new(u32::MAX)
    }

    fn interfere(&self, intents: &[WriteIntent]) {
        let stolen = self
            .steal
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !stolen {
            return;
        }
        if let Some(intent) = intents.iter().find(|i| i.is_write()) {
            if let Ok(current) = self.inner.read(intent.id) {
                let _ = self
                    .inner
                    .conditional_write(intent.id, current.version, current.quantity);
            }
        }
    }
}

impl RecordStore for ContendedStore {
    fn read(&self, id: LedgerId) -> Result<LedgerRecord, StoreError> {
        self.inner.read(id)
    }

    fn conditional_write(
        &self,
        id: LedgerId,
        expected: Version,
        new_quantity: u64,
    ) -> Result<Version, StoreError> {
        self.inner.conditional_write(id, expected, new_quantity)
    }

    fn commit_batch(&self, intents: &[WriteIntent]) -> Result<Vec<(LedgerId, Version)>, StoreError> {
        self.interfere(intents);
        self.inner.commit_batch(intents)
    }

    fn insert(&self, product_id: u64, quantity: u64) -> Result<LedgerRecord, StoreError> {
        self.inner.insert(product_id, quantity)
    }

    fn delete(&self, id: LedgerId) -> Result<bool, StoreError> {
        self.inner.delete(id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
