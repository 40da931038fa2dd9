use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::currency::Money;

/// Error type that captures common ledger failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Purchase index {index} out of range (ledger holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Rule violations detected at the boundary of a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("splits for `{description}` sum to {sum}, expected 1")]
    SplitSum {
        description: String,
        sum: rust_decimal::Decimal,
    },
    #[error("line item `{0}` has no splits")]
    EmptySplits(String),
    #[error("split ratio for `{participant}` must be between 0 and 1, got {ratio}")]
    RatioOutOfRange {
        participant: String,
        ratio: rust_decimal::Decimal,
    },
    #[error("item totals add up to {computed}, declared total is {declared}")]
    TotalMismatch { declared: Money, computed: Money },
    #[error("cost of `{0}` must not be negative")]
    NegativeCost(String),
    #[error("tax rate of `{0}` must not be negative")]
    NegativeTaxRate(String),
    #[error("cost of `{0}` exceeds the supported maximum")]
    CostTooLarge(String),
    #[error("tax rate of `{0}` exceeds the supported maximum")]
    TaxRateTooLarge(String),
    #[error("`{0}` is not a participant of this ledger")]
    UnknownParticipant(String),
    #[error("participant name must not be empty")]
    EmptyName,
    #[error("window end {end} is before start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

/// Non-fatal outcome of removing a participant who still appears in recorded purchases.
///
/// The affected purchases stay in the ledger untouched apart from the pruned split key;
/// they only fail validation again if somebody edits them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyWarning {
    pub participant: String,
    pub affected: Vec<AffectedPurchase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffectedPurchase {
    pub index: usize,
    pub id: Option<Uuid>,
    pub date: NaiveDate,
    pub store: String,
    /// Set when the removed participant was the buyer of this purchase.
    pub bought_by_removed: bool,
    /// Descriptions of items whose splits no longer sum to 1.
    pub unbalanced_items: Vec<String>,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removing `{}` left {} purchase(s) inconsistent:",
            self.participant,
            self.affected.len()
        )?;
        for purchase in &self.affected {
            write!(f, " #{} {} at {}", purchase.index, purchase.date, purchase.store)?;
            if purchase.bought_by_removed {
                write!(f, " (buyer removed)")?;
            }
            if !purchase.unbalanced_items.is_empty() {
                write!(f, " [{}]", purchase.unbalanced_items.join(", "))?;
            }
            write!(f, ";")?;
        }
        Ok(())
    }
}
