use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::line_item::LineItem;
use crate::{currency::Money, errors::ValidationError};

/// Maximum accepted gap between the declared total and the item totals.
pub const TOTAL_TOLERANCE: Money = Money::CENT;

/// A single buyer's receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    buyer: String,
    store: String,
    date: NaiveDate,
    declared_total: Money,
    #[serde(default)]
    items: Vec<LineItem>,
}

impl Purchase {
    pub fn new(
        buyer: impl Into<String>,
        store: impl Into<String>,
        date: NaiveDate,
        declared_total: Money,
        items: Vec<LineItem>,
    ) -> Result<Self, ValidationError> {
        let purchase = Self {
            id: None,
            buyer: buyer.into().trim().to_string(),
            store: store.into(),
            date,
            declared_total,
            items,
        };
        purchase.validate()?;
        Ok(purchase)
    }

    /// Checks the buyer, every item, and the declared total against the item totals.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.buyer.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        for item in &self.items {
            item.validate()?;
        }
        check_total(self.declared_total, &self.items)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn buyer(&self) -> &str {
        &self.buyer
    }

    pub fn store(&self) -> &str {
        &self.store
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn declared_total(&self) -> Money {
        self.declared_total
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of the item totals; balances use this rather than the declared total.
    pub fn total_cost(&self) -> Money {
        self.items.iter().map(LineItem::total_cost).sum()
    }

    /// Every participant named as buyer or in any split.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.buyer.as_str()).chain(
            self.items
                .iter()
                .flat_map(|item| item.splits().keys().map(String::as_str)),
        )
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub(crate) fn set_id(&mut self, id: Option<Uuid>) {
        self.id = id;
    }

    pub(crate) fn items_mut(&mut self) -> &mut [LineItem] {
        &mut self.items
    }

    /// Swaps in a new item list after it passes the total check.
    pub(crate) fn replace_items(&mut self, items: Vec<LineItem>) -> Result<(), ValidationError> {
        for item in &items {
            item.validate()?;
        }
        check_total(self.declared_total, &items)?;
        self.items = items;
        Ok(())
    }
}

fn check_total(declared: Money, items: &[LineItem]) -> Result<(), ValidationError> {
    let computed: Money = items.iter().map(LineItem::total_cost).sum();
    if !(computed - declared).within(TOTAL_TOLERANCE) {
        return Err(ValidationError::TotalMismatch { declared, computed });
    }
    Ok(())
}
