//! Multi-record reservations

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;
use stockledger::{Error, Ledger, Version};

#[test]
fn test_reserve_takes_every_line() {
    let (ledger, a) = ledger_with(10);
    let b = ledger.provision(2, 5).unwrap().id;

    let receipts = ledger.reserve(&[(b, 2), (a, 3)]).unwrap();
    assert_eq!(receipts.len(), 2);
    // Ascending id order
    assert_eq!(receipts[0].id, a);
    assert_eq!(receipts[1].id, b);
    assert_eq!(ledger.get(a).unwrap().quantity, 7);
    assert_eq!(ledger.get(b).unwrap().quantity, 3);
}

#[test]
fn test_short_line_fails_whole_reservation() {
    let (ledger, a) = ledger_with(10);
    let b = ledger.provision(2, 1).unwrap().id;

    let err = ledger.reserve(&[(a, 3), (b, 2)]).unwrap_err();
    assert!(matches!(err, Error::InsufficientQuantity { id, .. } if id == b));

    for id in [a, b] {
        assert_eq!(ledger.get(id).unwrap().version, Version::INITIAL);
    }
}

#[test]
fn test_repeated_lines_are_summed() {
    let (ledger, a) = ledger_with(5);

    assert!(ledger.reserve(&[(a, 3), (a, 3)]).unwrap_err().is_insufficient());
    let receipts = ledger.reserve(&[(a, 2), (a, 3)]).unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].quantity, 0);
}

#[test]
fn test_missing_record_fails_reservation() {
    let (ledger, a) = ledger_with(5);
    let gone = ledger.provision(2, 5).unwrap().id;
    ledger.remove(gone).unwrap();

    assert!(ledger.reserve(&[(a, 1), (gone, 1)]).unwrap_err().is_not_found());
    assert_eq!(ledger.get(a).unwrap().quantity, 5);
}

#[test]
fn test_concurrent_overlapping_orders_stay_consistent() {
    init_tracing();
    let ledger = Arc::new(Ledger::in_memory());
    let a = ledger.provision(1, 200).unwrap().id;
    let b = ledger.provision(2, 200).unwrap().id;

    const NUM_THREADS: usize = 6;
    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut taken = 0u64;
                for _ in 0..20 {
                    // Line order must not matter
                    let lines = if i % 2 == 0 { [(a, 1), (b, 1)] } else { [(b, 1), (a, 1)] };
                    loop {
                        match ledger.reserve(&lines) {
                            Ok(_) => {
                                taken += 1;
                                break;
                            }
                            Err(e) if e.is_retryable() => continue,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
                taken
            })
        })
        .collect();

    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 120);

    let ra = ledger.get(a).unwrap();
    let rb = ledger.get(b).unwrap();
    assert_eq!(ra.quantity, 80);
    assert_eq!(rb.quantity, 80);
    assert_eq!(ra.version, Version::from(120u64));
    assert_eq!(rb.version, Version::from(120u64));
}
