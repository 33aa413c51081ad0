//! Transaction scopes
//!
//! Every operation opens its own scope. A scope opened inside another
//! commits on its own, so an outer failure does not undo it.

use crate::common::*;
use stockledger::{Error, Version};
use stockledger_concurrency::CommitError;

#[derive(Debug)]
enum OuterError {
    Commit(CommitError),
    Ledger(Error),
    Abandoned,
}

impl From<CommitError> for OuterError {
    fn from(e: CommitError) -> Self {
        OuterError::Commit(e)
    }
}

impl From<Error> for OuterError {
    fn from(e: Error) -> Self {
        OuterError::Ledger(e)
    }
}

#[test]
fn test_inner_decrease_survives_outer_failure() {
    let (ledger, id) = ledger_with(10);
    let other = ledger.provision(2, 10).unwrap().id;
    let engine = ledger.engine();

    let out: Result<(), OuterError> =
        engine
            .manager()
            .run_in_transaction(engine.store(), |outer| {
                outer.write(other, 0)?;
                ledger.decrease(id, 4)?;
                Err(OuterError::Abandoned)
            });

    assert!(matches!(out, Err(OuterError::Abandoned)));
    assert_eq!(ledger.get(id).unwrap().quantity, 6);
    // Outer buffered write never reached the store
    let untouched = ledger.get(other).unwrap();
    assert_eq!((untouched.quantity, untouched.version), (10, Version::INITIAL));
}

#[test]
fn test_outer_scope_sees_inner_commit_as_conflict() {
    let (ledger, id) = ledger_with(10);
    let engine = ledger.engine();

    let out: Result<(), OuterError> =
        engine
            .manager()
            .run_in_transaction(engine.store(), |outer| {
                let seen = outer.read(id)?;
                ledger.decrease(id, 1)?;
                outer.write(id, seen.quantity - 5)?;
                Ok(())
            });

    // The outer scope read before the inner commit, so its write is stale
    assert!(matches!(out, Err(OuterError::Commit(CommitError::Conflict(_)))));
    assert_eq!(ledger.get(id).unwrap().quantity, 9);
}

#[test]
fn test_failed_operation_counts_as_abort() {
    let (ledger, id) = ledger_with(1);
    ledger.decrease(id, 2).unwrap_err();

    let m = ledger.metrics();
    assert_eq!(m.transactions_committed, 0);
    assert_eq!(m.transactions_aborted, 1);
}
