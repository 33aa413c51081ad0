//! Optional in-process serialization per record
//!
//! When enabled, operations on the same record queue up instead of racing
//! and retrying. This only trims wasted attempts inside one process; other
//! processes sharing the store are not excluded, so the version check stays
//! the sole correctness mechanism.
//!
//! A set of held ids behind one mutex lets a multi-record operation take all
//! of its ids in a single step, so there is no lock-ordering hazard.

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;
use std::time::Duration;
use stockledger_concurrency::CancellationToken;
use stockledger_core::LedgerId;

/// How often a waiter re-checks its cancellation token
const CANCEL_POLL: Duration = Duration::from_millis(5);

/// Registry of records currently held by an in-process operation
#[derive(Debug, Default)]
pub struct RecordLocks {
    held: Mutex<FxHashSet<LedgerId>>,
    released: Condvar,
}

/// Holds a set of records until dropped
#[derive(Debug)]
pub struct RecordGuard<'a> {
    locks: &'a RecordLocks,
    ids: Vec<LedgerId>,
}

impl RecordLocks {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until none of `ids` is held, then hold all of them
    ///
    /// Returns `None` if `cancel` fires while waiting.
    pub fn acquire(&self, ids: &[LedgerId], cancel: &CancellationToken) -> Option<RecordGuard<'_>> {
        let mut held = self.held.lock();
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if ids.iter().all(|id| !held.contains(id)) {
                held.extend(ids.iter().copied());
                return Some(RecordGuard {
                    locks: self,
                    ids: ids.to_vec(),
                });
            }
            let _ = self.released.wait_for(&mut held, CANCEL_POLL);
        }
    }

    /// Whether `id` is currently held
    pub fn is_held(&self, id: LedgerId) -> bool {
        self.held.lock().contains(&id)
    }
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for id in &self.ids {
            held.remove(id);
        }
        self.locks.released.notify_all();
    }
}
