//! Sharded in-memory record store
//!
//! DashMap of per-record slots, each slot behind its own mutex.
//!
//! # Design
//!
//! - DashMap: 16-way sharded by default, short shard locks only for lookup
//! - FxHash: fast non-crypto hashing of `LedgerId`
//! - Per-record `Mutex<Slot>`: the compare-version-then-bump step runs with
//!   the slot locked, so it is indivisible for every other caller
//!
//! # Lock Ordering
//!
//! Shard guards are never held while a slot mutex is acquired. Batch
//! commits lock slots in ascending `LedgerId` order, so two overlapping
//! batches cannot deadlock.

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stockledger_core::{LedgerId, LedgerRecord, RecordStore, StoreError, Version, WriteIntent};

type FxBuild = BuildHasherDefault<FxHasher>;

/// Storage cell for one record
///
/// `deleted` is set under the slot lock before the slot leaves the map, so a
/// writer that fetched the slot just before removal still sees `NotFound`.
#[derive(Debug)]
struct Slot {
    record: LedgerRecord,
    deleted: bool,
}

impl Slot {
    fn check(&self, id: LedgerId, expected: Version) -> Result<(), StoreError> {
        if self.deleted {
            return Err(StoreError::NotFound(id));
        }
        if self.record.version != expected {
            return Err(StoreError::VersionMismatch {
                id,
                expected,
                actual: self.record.version,
            });
        }
        Ok(())
    }

    fn apply(&mut self, new_quantity: u64) -> Version {
        self.record.quantity = new_quantity;
        self.record.version = self.record.version.next();
        self.record.version
    }
}

/// In-memory [`RecordStore`]
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - `read()`: shard read guard for lookup, then the record's slot lock
/// - `conditional_write()`: only locks the target record
/// - Different records never contend on slot locks
///
/// # Example
///
/// ```
/// use stockledger_core::{RecordStore, Version};
/// use stockledger_storage::ShardedStore;
///
/// let store = ShardedStore::new();
/// let record = store.insert(1001, 10).unwrap();
/// let v1 = store.conditional_write(record.id, Version::INITIAL, 7).unwrap();
/// assert_eq!(v1, Version::from(1u64));
/// assert!(store.conditional_write(record.id, Version::INITIAL, 5).is_err());
/// ```
pub struct ShardedStore {
    slots: DashMap<LedgerId, Arc<Mutex<Slot>>, FxBuild>,
    /// Last id handed out by `insert`
    next_id: AtomicU64,
    /// Committed writes across all records
    commits: AtomicU64,
}

impl ShardedStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_hasher(FxBuild::default()),
            next_id: AtomicU64::new(0),
            commits: AtomicU64::new(0),
        }
    }

    /// Create with expected number of records
    pub fn with_capacity(records: usize) -> Self {
        Self {
            slots: DashMap::with_capacity_and_hasher(records, FxBuild::default()),
            next_id: AtomicU64::new(0),
            commits: AtomicU64::new(0),
        }
    }

    /// Total committed writes since creation
    #[inline]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    /// Check if a record exists
    pub fn contains(&self, id: LedgerId) -> bool {
        self.slot(id)
            .map(|slot| !slot.lock().deleted)
            .unwrap_or(false)
    }

    /// All live records, sorted by id
    ///
    /// Not on the hot path: collects and sorts.
    pub fn list(&self) -> Vec<LedgerRecord> {
        let slots: Vec<_> = self
            .slots
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut records: Vec<_> = slots
            .iter()
            .filter_map(|slot| {
                let slot = slot.lock();
                (!slot.deleted).then(|| slot.record.clone())
            })
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Clone the slot handle so the shard guard is released before locking
    #[inline]
    fn slot(&self, id: LedgerId) -> Option<Arc<Mutex<Slot>>> {
        self.slots.get(&id).map(|entry| Arc::clone(entry.value()))
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("records", &self.slots.len())
            .field("commits", &self.commit_count())
            .finish()
    }
}

impl RecordStore for ShardedStore {
    fn read(&self, id: LedgerId) -> Result<LedgerRecord, StoreError> {
        let slot = self.slot(id).ok_or(StoreError::NotFound(id))?;
        let slot = slot.lock();
        if slot.deleted {
            return Err(StoreError::NotFound(id));
        }
        Ok(slot.record.clone())
    }

    fn conditional_write(
        &self,
        id: LedgerId,
        expected: Version,
        new_quantity: u64,
    ) -> Result<Version, StoreError> {
        let slot = self.slot(id).ok_or(StoreError::NotFound(id))?;
        let mut slot = slot.lock();
        if let Err(e) = slot.check(id, expected) {
            tracing::trace!(%id, %expected, error = %e, "conditional write rejected");
            return Err(e);
        }
        let version = slot.apply(new_quantity);
        self.commits.fetch_add(1, Ordering::AcqRel);
        Ok(version)
    }

    fn commit_batch(&self, intents: &[WriteIntent]) -> Result<Vec<(LedgerId, Version)>, StoreError> {
        let mut ordered: Vec<WriteIntent> = intents.to_vec();
        ordered.sort_by_key(|intent| intent.id);
        if ordered.windows(2).any(|pair| pair[0].id == pair[1].id) {
            return Err(StoreError::Unavailable(
                "batch names the same record twice".to_string(),
            ));
        }

        let handles = ordered
            .iter()
            .map(|intent| self.slot(intent.id).ok_or(StoreError::NotFound(intent.id)))
            .collect::<Result<Vec<_>, _>>()?;

        // Ascending id order; see module docs
        let mut guards: Vec<MutexGuard<'_, Slot>> = handles.iter().map(|h| h.lock()).collect();

        for (intent, slot) in ordered.iter().zip(guards.iter()) {
            if let Err(e) = slot.check(intent.id, intent.expected) {
                tracing::trace!(id = %intent.id, error = %e, "batch commit rejected");
                return Err(e);
            }
        }

        let mut committed = Vec::new();
        for (intent, slot) in ordered.iter().zip(guards.iter_mut()) {
            if let Some(quantity) = intent.new_quantity {
                committed.push((intent.id, slot.apply(quantity)));
            }
        }
        self.commits
            .fetch_add(committed.len() as u64, Ordering::AcqRel);
        Ok(committed)
    }

    fn insert(&self, product_id: u64, quantity: u64) -> Result<LedgerRecord, StoreError> {
        let id = LedgerId::new(self.next_id.fetch_add(1, Ordering::AcqRel) + 1);
        let record = LedgerRecord::new(id, product_id, quantity);
        self.slots.insert(
            id,
            Arc::new(Mutex::new(Slot {
                record: record.clone(),
                deleted: false,
            })),
        );
        Ok(record)
    }

    fn delete(&self, id: LedgerId) -> Result<bool, StoreError> {
        let Some(slot) = self.slot(id) else {
            return Ok(false);
        };
        let mut guard = slot.lock();
        if guard.deleted {
            return Ok(false);
        }
        guard.deleted = true;
        self.slots.remove(&id);
        Ok(true)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}
