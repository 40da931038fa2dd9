use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{currency::Money, errors::ValidationError};

/// Maximum distance between the sum of split ratios and 1.
pub const SPLIT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Largest accepted pre-tax cost (one trillion). Keeps every ledger sum far from
/// the decimal overflow point.
pub const MAX_ITEM_COST: Money = Money::new(Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0));

/// Largest accepted tax rate (1000%).
pub const MAX_TAX_RATE: Decimal = Decimal::TEN;

/// One purchased item and how its cost is shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    description: String,
    pre_tax_cost: Money,
    tax_rate: Decimal,
    splits: BTreeMap<String, Decimal>,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        pre_tax_cost: Money,
        tax_rate: Decimal,
        splits: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Result<Self, ValidationError> {
        let mut merged: BTreeMap<String, Decimal> = BTreeMap::new();
        for (name, ratio) in splits {
            let participant = name.trim().to_string();
            let share = merged.entry(participant.clone()).or_insert(Decimal::ZERO);
            *share = share
                .checked_add(ratio)
                .ok_or(ValidationError::RatioOutOfRange { participant, ratio })?;
        }
        let item = Self {
            description: description.into(),
            pre_tax_cost,
            tax_rate,
            splits: merged,
        };
        item.validate()?;
        Ok(item)
    }

    /// Shares the item equally between `participants`.
    pub fn even_split<S: AsRef<str>>(
        description: impl Into<String>,
        pre_tax_cost: Money,
        tax_rate: Decimal,
        participants: &[S],
    ) -> Result<Self, ValidationError> {
        let description = description.into();
        if participants.is_empty() {
            return Err(ValidationError::EmptySplits(description));
        }
        let share = Decimal::ONE / Decimal::from(participants.len());
        let splits = participants
            .iter()
            .map(|name| (name.as_ref().to_string(), share));
        Self::new(description, pre_tax_cost, tax_rate, splits)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pre_tax_cost.is_negative() {
            return Err(ValidationError::NegativeCost(self.description.clone()));
        }
        if self.tax_rate.is_sign_negative() && !self.tax_rate.is_zero() {
            return Err(ValidationError::NegativeTaxRate(self.description.clone()));
        }
        self.check_bounds()?;
        if self.splits.is_empty() {
            return Err(ValidationError::EmptySplits(self.description.clone()));
        }
        if self.splits.keys().any(|participant| participant.trim().is_empty()) {
            return Err(ValidationError::EmptyName);
        }
        if !self.splits_balanced() {
            return Err(ValidationError::SplitSum {
                description: self.description.clone(),
                sum: self.split_sum(),
            });
        }
        Ok(())
    }

    /// Rejects amounts large enough to overflow decimal arithmetic further on.
    pub(crate) fn check_bounds(&self) -> Result<(), ValidationError> {
        if self.pre_tax_cost > MAX_ITEM_COST {
            return Err(ValidationError::CostTooLarge(self.description.clone()));
        }
        if self.tax_rate > MAX_TAX_RATE {
            return Err(ValidationError::TaxRateTooLarge(self.description.clone()));
        }
        for (participant, ratio) in &self.splits {
            if *ratio < Decimal::ZERO || *ratio > Decimal::ONE {
                return Err(ValidationError::RatioOutOfRange {
                    participant: participant.clone(),
                    ratio: *ratio,
                });
            }
        }
        Ok(())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pre_tax_cost(&self) -> Money {
        self.pre_tax_cost
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Read-only view of the participant → ratio map, ordered by name.
    pub fn splits(&self) -> &BTreeMap<String, Decimal> {
        &self.splits
    }

    pub fn share_of(&self, participant: &str) -> Option<Decimal> {
        self.splits.get(participant).copied()
    }

    pub fn split_sum(&self) -> Decimal {
        self.splits.values().copied().sum()
    }

    pub fn splits_balanced(&self) -> bool {
        (self.split_sum() - Decimal::ONE).abs() <= SPLIT_TOLERANCE
    }

    /// `pre_tax_cost * (1 + tax_rate)`, unrounded.
    pub fn total_cost(&self) -> Money {
        self.pre_tax_cost * (Decimal::ONE + self.tax_rate)
    }

    /// Amount charged to `participant` for this item.
    pub fn charge_for(&self, participant: &str) -> Money {
        self.share_of(participant)
            .map(|ratio| self.total_cost() * ratio)
            .unwrap_or(Money::ZERO)
    }

    /// Drops `participant` from the split map, returning whether it was present.
    pub(crate) fn prune_participant(&mut self, participant: &str) -> bool {
        self.splits.remove(participant).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn splits(pairs: &[(&str, Decimal)]) -> Vec<(String, Decimal)> {
        pairs
            .iter()
            .map(|(name, ratio)| (name.to_string(), *ratio))
            .collect()
    }

    #[test]
    fn total_cost_applies_tax() {
        let item = LineItem::new(
            "Groceries",
            Money::from_cents(10_000),
            dec!(0.07),
            splits(&[("A", dec!(1))]),
        )
        .expect("valid item");
        assert_eq!(item.total_cost(), Money::new(dec!(107)));
        assert_eq!(item.total_cost().to_string(), "107.00");
    }

    #[test]
    fn split_keys_are_trimmed_and_merged() {
        let item = LineItem::new(
            "Rent",
            Money::from_cents(100_000),
            Decimal::ZERO,
            splits(&[("A", dec!(0.5)), (" B", dec!(0.25)), ("B ", dec!(0.25))]),
        )
        .expect("duplicates after trimming are summed");
        assert_eq!(item.splits().len(), 2);
        assert_eq!(item.share_of("B"), Some(dec!(0.5)));
        assert_eq!(item.share_of(" B"), None);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let only_a = || splits(&[("A", dec!(1))]);
        let huge = LineItem::new("Vault", Money::new(Decimal::MAX), dec!(0.5), only_a());
        assert!(matches!(huge, Err(ValidationError::CostTooLarge(_))));

        let at_limit = LineItem::new("Island", MAX_ITEM_COST, MAX_TAX_RATE, only_a())
            .expect("limits are inclusive");
        assert_eq!(at_limit.total_cost(), Money::new(dec!(11_000_000_000_000)));

        let steep = LineItem::new("Luxury", Money::from_cents(100), dec!(10.01), only_a());
        assert!(matches!(steep, Err(ValidationError::TaxRateTooLarge(_))));

        let doubled = splits(&[("A", Decimal::MAX), (" A", Decimal::MAX)]);
        let merged = LineItem::new("Twice", Money::from_cents(100), Decimal::ZERO, doubled);
        assert!(matches!(merged, Err(ValidationError::RatioOutOfRange { .. })));
    }

    #[test]
    fn splits_within_tolerance_are_accepted() {
        let item = LineItem::new(
            "Soap",
            Money::from_cents(300),
            Decimal::ZERO,
            splits(&[("A", dec!(0.3333)), ("B", dec!(0.3333)), ("C", dec!(0.3333))]),
        );
        assert!(item.is_ok());
    }

    #[test]
    fn splits_outside_tolerance_are_rejected() {
        let err = LineItem::new(
            "Soap",
            Money::from_cents(300),
            Decimal::ZERO,
            splits(&[("A", dec!(0.5)), ("B", dec!(0.49))]),
        )
        .expect_err("0.99 is outside tolerance");
        assert!(matches!(err, ValidationError::SplitSum { sum, .. } if sum == dec!(0.99)));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let negative_cost = LineItem::new(
            "Refund",
            Money::from_cents(-100),
            Decimal::ZERO,
            splits(&[("A", dec!(1))]),
        );
        assert!(matches!(negative_cost, Err(ValidationError::NegativeCost(_))));

        let negative_tax = LineItem::new(
            "Odd",
            Money::from_cents(100),
            dec!(-0.1),
            splits(&[("A", dec!(1))]),
        );
        assert!(matches!(negative_tax, Err(ValidationError::NegativeTaxRate(_))));

        let negative_ratio = LineItem::new(
            "Odd",
            Money::from_cents(100),
            Decimal::ZERO,
            splits(&[("A", dec!(1.5)), ("B", dec!(-0.5))]),
        );
        assert!(matches!(
            negative_ratio,
            Err(ValidationError::RatioOutOfRange { .. })
        ));
    }

    #[test]
    fn even_split_divides_between_everyone() {
        let pizza = Money::from_cents(3000);
        let item = LineItem::even_split("Pizza", pizza, Decimal::ZERO, &["A", "B", "C"])
            .expect("valid item");
        assert_eq!(item.splits().len(), 3);
        assert!(item.splits_balanced());
        assert_eq!(item.charge_for("B").to_string(), "10.00");
        assert_eq!(item.charge_for("Z"), Money::ZERO);
    }
}
