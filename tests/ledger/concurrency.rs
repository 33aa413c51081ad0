//! Contention tests
//!
//! - No lost updates with many callers on one record
//! - Never below zero when demand exceeds supply
//! - Serialized mode gives the same totals

use crate::common::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use stockledger::{Error, Ledger, LedgerId, Version};

const NUM_THREADS: usize = 8;

/// Run `per_thread` single-unit decreases from each of NUM_THREADS threads
///
/// Returns (committed, refused) counts.
fn hammer(ledger: &Arc<Ledger>, id: LedgerId, per_thread: usize) -> (u64, u64) {
    let committed = Arc::new(AtomicU64::new(0));
    let refused = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let ledger = Arc::clone(ledger);
            let barrier = Arc::clone(&barrier);
            let committed = Arc::clone(&committed);
            let refused = Arc::clone(&refused);

            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    // Retry exhaustion is tolerable here; retry at the call site
                    loop {
                        match ledger.decrease(id, 1) {
                            Ok(_) => {
                                committed.fetch_add(1, Ordering::SeqCst);
                                break;
                            }
                            Err(Error::InsufficientQuantity { .. }) => {
                                refused.fetch_add(1, Ordering::SeqCst);
                                break;
                            }
                            Err(e) if e.is_retryable() => continue,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    (committed.load(Ordering::SeqCst), refused.load(Ordering::SeqCst))
}

#[test]
fn test_no_lost_updates() {
    let (ledger, id) = ledger_with(1_000);
    let ledger = Arc::new(ledger);

    let (committed, refused) = hammer(&ledger, id, 100);

    assert_eq!(committed, 800);
    assert_eq!(refused, 0);
    let r = ledger.get(id).unwrap();
    assert_eq!(r.quantity, 200);
    assert_eq!(r.version, Version::from(800u64));
}

#[test]
fn test_demand_exceeding_supply_stops_at_zero() {
    let (ledger, id) = ledger_with(50);
    let ledger = Arc::new(ledger);

    let (committed, refused) = hammer(&ledger, id, 20);

    assert_eq!(committed, 50);
    assert_eq!(refused, 160 - 50);
    let r = ledger.get(id).unwrap();
    assert_eq!(r.quantity, 0);
    assert_eq!(r.version, Version::from(50u64));
}

#[test]
fn test_serialized_mode_matches_optimistic_totals() {
    init_tracing();
    let ledger = Arc::new(
        Ledger::builder()
            .serialize_per_record(true)
            .open()
            .unwrap(),
    );
    let id = ledger.provision(1, 500).unwrap().id;

    let (committed, _) = hammer(&ledger, id, 40);

    assert_eq!(committed, 320);
    assert_eq!(ledger.get(id).unwrap().quantity, 180);
    // Queued callers never race, so nothing conflicts
    assert_eq!(ledger.metrics().conflicts, 0);
}

#[test]
fn test_independent_records_do_not_interfere() {
    init_tracing();
    let ledger = Arc::new(Ledger::in_memory());
    let ids: Vec<_> = (0..NUM_THREADS as u64)
        .map(|p| ledger.provision(p, 100).unwrap().id)
        .collect();

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    ledger.decrease(id, 1).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    for id in ids {
        assert_eq!(ledger.get(id).unwrap().quantity, 0);
    }
    assert_eq!(ledger.metrics().conflicts, 0);
}
