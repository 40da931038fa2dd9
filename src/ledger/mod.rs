//! Ledger domain models: line items, purchases, date windows, and the ledger aggregate.

#[allow(clippy::module_inception)]
pub mod ledger;
pub mod line_item;
pub mod purchase;
pub mod window;

pub use ledger::{Ledger, CURRENT_SCHEMA_VERSION};
pub use line_item::{LineItem, MAX_ITEM_COST, MAX_TAX_RATE, SPLIT_TOLERANCE};
pub use purchase::{Purchase, TOTAL_TOLERANCE};
pub use window::DateWindow;
