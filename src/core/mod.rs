pub mod ledger_manager;
pub mod services;
pub mod shared;

pub use ledger_manager::{LedgerManager, LoadMetadata};
pub use shared::SharedLedger;
