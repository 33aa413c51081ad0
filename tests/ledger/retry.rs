//! Retry behavior against a store with scripted contention

use crate::common::*;
use stockledger::{Error, Ledger, Version};

#[test]
fn test_recovers_after_transient_conflicts() {
    init_tracing();
    let store = ContendedStore::new(3);
    let ledger = Ledger::builder()
        .store(store)
        .max_attempts(5)
        .no_backoff()
        .open()
        .unwrap();
    let id = ledger.provision(1, 10).unwrap().id;

    let receipt = ledger.decrease(id, 4).unwrap();
    assert_eq!(receipt.attempts, 4);
    assert_eq!(receipt.quantity, 6);
    // Three stolen bumps, then ours
    assert_eq!(receipt.version, Version::from(4u64));

    let m = ledger.metrics();
    assert_eq!(m.conflicts, 3);
    assert_eq!(m.retries, 3);
    assert_eq!(m.exhausted, 0);
}

#[test]
fn test_exhaustion_surfaces_conflict() {
    init_tracing();
    let ledger = Ledger::builder()
        .store(ContendedStore::always())
        .max_attempts(4)
        .no_backoff()
        .open()
        .unwrap();
    let id = ledger.provision(1, 10).unwrap().id;

    let err = ledger.decrease(id, 1).unwrap_err();
    assert!(matches!(err, Error::Conflict { attempts: 4, .. }));
    assert!(err.is_retryable());

    // Interference moved the version, never the balance
    assert_eq!(ledger.get(id).unwrap().quantity, 10);
    assert_eq!(ledger.metrics().exhausted, 1);
}

#[test]
fn test_single_attempt_policy() {
    init_tracing();
    let ledger = Ledger::builder()
        .store(ContendedStore::new(1))
        .max_attempts(1)
        .open()
        .unwrap();
    let id = ledger.provision(1, 10).unwrap().id;

    assert!(ledger.decrease(id, 1).unwrap_err().is_conflict());
    // Contention has passed; the next call succeeds first time
    assert_eq!(ledger.decrease(id, 1).unwrap().attempts, 1);
}

#[test]
fn test_business_failure_never_retried_under_contention() {
    init_tracing();
    let ledger = Ledger::builder()
        .store(ContendedStore::always())
        .no_backoff()
        .open()
        .unwrap();
    let id = ledger.provision(1, 2).unwrap().id;

    assert!(ledger.decrease(id, 3).unwrap_err().is_insufficient());
    let m = ledger.metrics();
    assert_eq!(m.conflicts, 0);
    assert_eq!(m.rejected, 1);
}
