//! Configuration loading through the facade

use std::io::Write;
use stockledger::{EngineConfig, Error, Ledger};

#[test]
fn test_ledger_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_attempts = 2").unwrap();
    writeln!(file, "serialize_per_record = true").unwrap();

    let ledger = Ledger::from_config_file(file.path()).unwrap();
    assert_eq!(ledger.config().max_attempts, 2);
    assert!(ledger.config().serialize_per_record);

    let id = ledger.provision(1, 3).unwrap().id;
    assert_eq!(ledger.decrease(id, 3).unwrap().quantity, 0);
}

#[test]
fn test_invalid_file_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_attempts = 0").unwrap();

    let err = Ledger::from_config_file(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Ledger::from_config_file(dir.path().join("ledger.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_builder_overrides_config() {
    let config = EngineConfig::from_toml_str("max_attempts = 3").unwrap();
    let ledger = Ledger::builder()
        .config(config)
        .max_attempts(7)
        .no_backoff()
        .open()
        .unwrap();

    assert_eq!(ledger.config().max_attempts, 7);
    assert_eq!(ledger.config().backoff_initial_ms, 0);
}
