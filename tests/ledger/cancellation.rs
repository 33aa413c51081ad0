//! Cancellation and deadlines

use crate::common::*;
use std::time::Duration;
use stockledger::{CancellationToken, Error, Ledger, Version};

#[test]
fn test_cancelled_token_leaves_record_untouched() {
    let (ledger, id) = ledger_with(10);
    let token = CancellationToken::new();
    token.cancel();

    assert!(matches!(
        ledger.decrease_with(id, 3, &token),
        Err(Error::Cancelled)
    ));
    let r = ledger.get(id).unwrap();
    assert_eq!((r.quantity, r.version), (10, Version::INITIAL));
    assert_eq!(ledger.metrics().cancelled, 1);
}

#[test]
fn test_deadline_interrupts_backoff() {
    init_tracing();
    let ledger = Ledger::builder()
        .store(ContendedStore::always())
        .max_attempts(100)
        .backoff(10_000, 10_000)
        .open()
        .unwrap();
    let id = ledger.provision(1, 10).unwrap().id;

    let token = CancellationToken::with_timeout(Duration::from_millis(30));
    assert!(matches!(
        ledger.decrease_with(id, 1, &token),
        Err(Error::Cancelled)
    ));
    assert_eq!(ledger.get(id).unwrap().quantity, 10);
}

#[test]
fn test_configured_operation_timeout() {
    init_tracing();
    let ledger = Ledger::builder()
        .store(ContendedStore::always())
        .max_attempts(100)
        .backoff(10_000, 10_000)
        .operation_timeout(Duration::from_millis(30))
        .open()
        .unwrap();
    let id = ledger.provision(1, 10).unwrap().id;

    assert!(matches!(ledger.decrease(id, 1), Err(Error::Cancelled)));
}

#[test]
fn test_cancel_after_commit_keeps_commit() {
    let (ledger, id) = ledger_with(10);
    let token = CancellationToken::new();

    ledger.decrease_with(id, 3, &token).unwrap();
    token.cancel();

    assert_eq!(ledger.get(id).unwrap().quantity, 7);
}

#[test]
fn test_cancelled_reservation_applies_nothing() {
    let (ledger, a) = ledger_with(10);
    let b = ledger.provision(2, 10).unwrap().id;
    let token = CancellationToken::new();
    token.cancel();

    assert!(matches!(
        ledger.reserve_with(&[(a, 1), (b, 1)], &token),
        Err(Error::Cancelled)
    ));
    assert_eq!(ledger.get(a).unwrap().quantity, 10);
    assert_eq!(ledger.get(b).unwrap().quantity, 10);
}
