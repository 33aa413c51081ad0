//! Property tests over arbitrary single-threaded request sequences

use proptest::prelude::*;
use stockledger::{Error, Ledger, Version};

proptest! {
    #[test]
    fn quantity_never_negative_and_version_counts_commits(
        initial in 0u64..200,
        amounts in prop::collection::vec(0u64..60, 0..40),
    ) {
        let ledger = Ledger::in_memory();
        let id = ledger.provision(1, initial).unwrap().id;

        let mut expected = initial;
        let mut commits = 0u64;
        for amount in amounts {
            let before = ledger.get(id).unwrap();
            match ledger.decrease(id, amount) {
                Ok(receipt) => {
                    prop_assert!(amount > 0 && amount <= expected);
                    expected -= amount;
                    commits += 1;
                    prop_assert_eq!(receipt.quantity, expected);
                }
                Err(Error::InsufficientQuantity { requested, available, .. }) => {
                    prop_assert!(amount > expected);
                    prop_assert_eq!((requested, available), (amount, expected));
                    prop_assert_eq!(ledger.get(id).unwrap(), before);
                }
                Err(Error::InvalidAmount(0)) => {
                    prop_assert_eq!(amount, 0);
                }
                Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {}", e))),
            }
        }

        let r = ledger.get(id).unwrap();
        prop_assert_eq!(r.quantity, expected);
        prop_assert_eq!(r.version, Version::from(commits));
    }

    #[test]
    fn restock_then_drain_returns_to_start(
        initial in 0u64..1_000,
        restock in 1u64..1_000,
    ) {
        let ledger = Ledger::in_memory();
        let id = ledger.provision(1, initial).unwrap().id;

        ledger.increase(id, restock).unwrap();
        ledger.decrease(id, restock).unwrap();

        let r = ledger.get(id).unwrap();
        prop_assert_eq!(r.quantity, initial);
        prop_assert_eq!(r.version, Version::from(2u64));
    }
}
