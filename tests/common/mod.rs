#![allow(dead_code)]

use std::sync::Mutex;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use split_ledger::{
    config::ConfigManager,
    core::LedgerManager,
    currency::Money,
    ledger::{Ledger, LineItem, Purchase},
    storage::JsonStorage,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates isolated managers backed by unique directories for each test.
pub fn setup_test_env() -> (LedgerManager, ConfigManager) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let storage = JsonStorage::new(Some(base.clone()), Some(3))
        .expect("create json storage backend")
        .with_default_participants(vec!["A".into(), "B".into()]);
    let ledger_manager = LedgerManager::new(Box::new(storage));
    let config_manager =
        ConfigManager::with_base_dir(base).expect("create config manager for temp dir");

    (ledger_manager, config_manager)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).expect("valid date")
}

pub fn dollars(amount: i64) -> Money {
    Money::from_cents(amount * 100)
}

/// Single tax-free item shared evenly, declared total equal to its cost.
pub fn even_purchase(
    buyer: &str,
    store: &str,
    date: NaiveDate,
    cost: Money,
    sharers: &[&str],
) -> Purchase {
    let item = LineItem::even_split("Groceries", cost, Decimal::ZERO, sharers).expect("valid item");
    Purchase::new(buyer, store, date, cost, vec![item]).expect("valid purchase")
}

/// A buys 90 and B buys 60, both split evenly between A, B and C.
pub fn three_way_ledger() -> Ledger {
    let mut ledger = Ledger::with_participants(["A", "B", "C"]).expect("roster");
    ledger
        .add_purchase(even_purchase("A", "Market", day(1), dollars(90), &["A", "B", "C"]))
        .expect("first purchase");
    ledger
        .add_purchase(even_purchase("B", "Hardware", day(2), dollars(60), &["A", "B", "C"]))
        .expect("second purchase");
    ledger
}
