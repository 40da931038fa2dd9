#![doc(test(attr(deny(warnings))))]

//! Split Ledger records shared household purchases, works out who owes whom,
//! and reduces the debts to a short list of payments.

pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod export;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use crate::core::services::{
    BalanceService, Balances, ParticipantSummary, Payment, SettlementPlan, SettlementService,
};
pub use crate::core::{LedgerManager, SharedLedger};
pub use currency::Money;
pub use errors::{ConsistencyWarning, LedgerError, ValidationError};
pub use ledger::{DateWindow, Ledger, LineItem, Purchase};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Split Ledger tracing initialized.");
    });
}
