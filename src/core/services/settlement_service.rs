//! Greedy debt simplification.

use serde::Serialize;

use super::balance_service::Balances;
use crate::currency::Money;

/// Balances at or below this magnitude count as settled.
pub const SETTLEMENT_EPSILON: Money = Money::CENT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub from: String,
    pub to: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementPlan {
    pub payments: Vec<Payment>,
    /// Balances the pass could not clear; only non-empty when the input did not sum to zero.
    pub residuals: Vec<(String, Money)>,
}

impl SettlementPlan {
    pub fn is_balanced(&self) -> bool {
        self.residuals.is_empty()
    }

    /// Balances after every payment has been made.
    pub fn apply_to(&self, balances: &Balances) -> Balances {
        let mut settled = balances.clone();
        for payment in &self.payments {
            settled.adjust(&payment.from, payment.amount);
            settled.adjust(&payment.to, -payment.amount);
        }
        settled
    }
}

pub struct SettlementService;

impl SettlementService {
    /// Turns net balances into pairwise payments.
    ///
    /// Debtors and creditors are each ordered by name, then matched head to head:
    /// the head debtor pays the head creditor the smaller of the two amounts and
    /// whichever side reaches zero moves on. Simple and reproducible, not a
    /// minimum-transaction solution.
    pub fn plan(balances: &Balances) -> SettlementPlan {
        let mut debtors: Vec<(String, Money)> = balances
            .iter()
            .filter(|(_, amount)| *amount < -SETTLEMENT_EPSILON)
            .map(|(name, amount)| (name.to_string(), -amount))
            .collect();
        let mut creditors: Vec<(String, Money)> = balances
            .iter()
            .filter(|(_, amount)| *amount > SETTLEMENT_EPSILON)
            .map(|(name, amount)| (name.to_string(), amount))
            .collect();
        debtors.sort_by(|a, b| a.0.cmp(&b.0));
        creditors.sort_by(|a, b| a.0.cmp(&b.0));

        let mut payments = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < debtors.len() && j < creditors.len() {
            let amount = debtors[i].1.min(creditors[j].1);
            payments.push(Payment {
                from: debtors[i].0.clone(),
                to: creditors[j].0.clone(),
                amount,
            });
            debtors[i].1 -= amount;
            creditors[j].1 -= amount;
            if debtors[i].1.within(SETTLEMENT_EPSILON) {
                i += 1;
            }
            if creditors[j].1.within(SETTLEMENT_EPSILON) {
                j += 1;
            }
        }

        let residuals: Vec<(String, Money)> = debtors[i..]
            .iter()
            .map(|(name, owed)| (name.clone(), -*owed))
            .chain(creditors[j..].iter().cloned())
            .collect();
        if !residuals.is_empty() {
            tracing::warn!(
                unsettled = residuals.len(),
                total = %balances.total(),
                "balances do not sum to zero; settlement left residuals"
            );
        }
        tracing::debug!(payments = payments.len(), "settlement planned");
        SettlementPlan {
            payments,
            residuals,
        }
    }
}
