mod common;

use std::fs;

use common::{setup_test_env, three_way_ledger};
use split_ledger::{
    config::Config,
    storage::{JsonStorage, LoadOrigin, StorageBackend},
    DateWindow, LedgerError, SharedLedger,
};
use tempfile::tempdir;

#[test]
fn missing_file_is_an_explicit_fresh_start() {
    let (mut manager, _config) = setup_test_env();
    let metadata = manager.load("household").expect("load");
    assert_eq!(metadata.origin, LoadOrigin::Fresh);
    assert_eq!(manager.current().unwrap().participants(), ["A", "B"]);
}

#[test]
fn saved_purchases_survive_reload() {
    let (mut manager, _config) = setup_test_env();
    manager.set_current(three_way_ledger(), Some("household".into()));
    let path = manager.save().expect("save");
    assert!(path.exists());

    manager.clear();
    let metadata = manager.load("household").expect("reload");
    assert_eq!(metadata.origin, LoadOrigin::Disk);
    assert!(metadata.warnings.is_empty());
    let ledger = manager.current().unwrap();
    assert_eq!(ledger.purchase_count(), 2);
    assert_eq!(ledger.purchases()[1].store(), "Hardware");

    let plan = manager.settle(DateWindow::unbounded()).unwrap();
    assert_eq!(plan.payments.len(), 2);
}

#[test]
fn ledger_with_removed_participant_stays_loadable() {
    let (mut manager, _config) = setup_test_env();
    let mut ledger = three_way_ledger();
    ledger.remove_participant("C").unwrap();
    manager.set_current(ledger, Some("household".into()));
    manager.save().unwrap();

    manager.clear();
    let metadata = manager.load("household").expect("inconsistent ledger still loads");
    assert_eq!(metadata.warnings.len(), 2);
}

#[test]
fn corrupt_file_is_an_error() {
    let temp = tempdir().unwrap();
    let storage = JsonStorage::new(Some(temp.path().to_path_buf()), None).unwrap();
    fs::write(storage.ledger_path("household"), "[1, 2").unwrap();
    assert!(matches!(storage.load("household"), Err(LedgerError::Serde(_))));
}

#[test]
fn newer_schema_is_rejected() {
    let temp = tempdir().unwrap();
    let storage = JsonStorage::new(Some(temp.path().to_path_buf()), None).unwrap();
    let path = storage.save(&three_way_ledger(), "household").unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    value["schema_version"] = serde_json::json!(99);
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let err = storage.load("household").expect_err("future schema");
    assert!(matches!(err, LedgerError::Persistence(_)), "unexpected: {err:?}");
}

#[test]
fn resaving_keeps_a_backup_of_the_previous_file() {
    let temp = tempdir().unwrap();
    let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(2)).unwrap();
    let mut ledger = three_way_ledger();
    storage.save(&ledger, "household").unwrap();
    ledger.remove_purchase(1).unwrap();
    storage.save(&ledger, "household").unwrap();

    let backups = storage.list_backups("household").unwrap();
    assert_eq!(backups.len(), 1);
    let restored = storage.restore("household", &backups[0]).unwrap();
    assert_eq!(restored.purchase_count(), 2);
    assert_eq!(storage.load("household").unwrap().ledger.purchase_count(), 2);
}

#[test]
fn config_round_trip_drives_storage() {
    let (_manager, config_manager) = setup_test_env();
    let mut config = config_manager.load().unwrap();
    assert_eq!(config, Config::default());
    config.default_participants = vec!["Sam".into(), "Robin".into()];
    config.currency_symbol = "€".into();
    config_manager.save(&config).unwrap();

    let reloaded = config_manager.load().unwrap();
    assert_eq!(reloaded.currency_format().symbol, "€");

    let data = tempdir().unwrap();
    let mut with_dir = reloaded.clone();
    with_dir.data_dir = Some(data.path().to_path_buf());
    let storage = JsonStorage::from_config(&with_dir).unwrap();
    let report = storage.load("fresh").unwrap();
    assert_eq!(report.ledger.participants(), ["Sam", "Robin"]);
}

#[test]
fn shared_ledger_publishes_only_successful_writes() {
    let shared = SharedLedger::new(three_way_ledger());
    let failed = shared.mutate(|ledger| {
        ledger.remove_purchase(0)?;
        ledger.remove_purchase(9)
    });
    assert!(failed.is_err());
    assert_eq!(shared.snapshot().unwrap().purchase_count(), 2);
}
