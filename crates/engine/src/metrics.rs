//! Engine counters
//!
//! Plain atomics, read as a [`MetricsSnapshot`]. Counts are per operation
//! except `conflicts` and `retries`, which are per attempt.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by the engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    committed: AtomicU64,
    conflicts: AtomicU64,
    retries: AtomicU64,
    rejected: AtomicU64,
    cancelled: AtomicU64,
    exhausted: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Operations that committed
    pub committed: u64,
    /// Attempts that lost the version race
    pub conflicts: u64,
    /// Attempts started after a conflict
    pub retries: u64,
    /// Operations rejected by a business rule or bad input
    pub rejected: u64,
    /// Operations cancelled by the caller or a deadline
    pub cancelled: u64,
    /// Operations that ran out of attempts
    pub exhausted: u64,
}

impl MetricsSnapshot {
    /// Fraction of finished operations that committed
    pub fn commit_rate(&self) -> f64 {
        let finished = self.committed + self.rejected + self.cancelled + self.exhausted;
        if finished == 0 {
            0.0
        } else {
            self.committed as f64 / finished as f64
        }
    }
}

impl EngineMetrics {
    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            committed: self.committed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}
