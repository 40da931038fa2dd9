//! Net balance aggregation over a date window.

use serde::Serialize;

use crate::currency::Money;
use crate::ledger::{DateWindow, Ledger};

/// Paid and consumed amounts for one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSummary {
    pub participant: String,
    pub paid: Money,
    pub owed: Money,
    /// False for names that only survive in historical purchases.
    pub on_roster: bool,
}

impl ParticipantSummary {
    fn empty(participant: &str, on_roster: bool) -> Self {
        Self {
            participant: participant.to_string(),
            paid: Money::ZERO,
            owed: Money::ZERO,
            on_roster,
        }
    }

    /// Positive when the participant is owed money.
    pub fn balance(&self) -> Money {
        self.paid - self.owed
    }
}

/// Signed net balance per participant, in roster order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balances {
    entries: Vec<(String, Money)>,
}

impl Balances {
    pub fn get(&self, participant: &str) -> Option<Money> {
        self.entries
            .iter()
            .find(|(name, _)| name == participant)
            .map(|(_, amount)| *amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> {
        self.entries
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all balances; zero for a conserved ledger.
    pub fn total(&self) -> Money {
        self.entries.iter().map(|(_, amount)| *amount).sum()
    }

    /// Adds `delta` to a participant, inserting them at the end if missing.
    pub fn adjust(&mut self, participant: &str, delta: Money) {
        match self.entries.iter_mut().find(|(name, _)| name == participant) {
            Some((_, amount)) => *amount += delta,
            None => self.entries.push((participant.to_string(), delta)),
        }
    }
}

impl FromIterator<(String, Money)> for Balances {
    fn from_iter<T: IntoIterator<Item = (String, Money)>>(iter: T) -> Self {
        let mut balances = Balances::default();
        for (name, amount) in iter {
            balances.adjust(&name, amount);
        }
        balances
    }
}

pub struct BalanceService;

impl BalanceService {
    /// Paid/owed totals for every participant over `window` (inclusive).
    ///
    /// Every roster member gets a row even without activity. Buyers and split keys
    /// that are no longer on the roster get rows appended after it. Any share of an
    /// item not covered by its splits is charged to the buyer, so the balances sum to
    /// zero up to the last digit of decimal precision (far below one cent).
    pub fn summarize(ledger: &Ledger, window: DateWindow) -> Vec<ParticipantSummary> {
        let mut rows: Vec<ParticipantSummary> = ledger
            .participants()
            .iter()
            .map(|name| ParticipantSummary::empty(name, true))
            .collect();

        let mut counted = 0usize;
        for purchase in ledger.purchases_in(window) {
            counted += 1;
            for item in purchase.items() {
                let total = item.total_cost();
                let mut allocated = Money::ZERO;
                for (name, ratio) in item.splits() {
                    let share = total * *ratio;
                    allocated += share;
                    row_mut(&mut rows, name).owed += share;
                }
                let remainder = total - allocated;
                if !remainder.is_zero() {
                    row_mut(&mut rows, purchase.buyer()).owed += remainder;
                }
            }
            row_mut(&mut rows, purchase.buyer()).paid += purchase.total_cost();
        }
        tracing::debug!(
            purchases = counted,
            participants = rows.len(),
            start = %window.start,
            end = %window.end,
            "balances summarized"
        );
        rows
    }

    /// Net balance (`paid - owed`) per participant over `window` (inclusive).
    pub fn compute_balances(ledger: &Ledger, window: DateWindow) -> Balances {
        Self::summarize(ledger, window)
            .into_iter()
            .map(|row| {
                let balance = row.balance();
                (row.participant, balance)
            })
            .collect()
    }
}

fn row_mut<'a>(rows: &'a mut Vec<ParticipantSummary>, name: &str) -> &'a mut ParticipantSummary {
    let position = match rows.iter().position(|row| row.participant == name) {
        Some(position) => position,
        None => {
            rows.push(ParticipantSummary::empty(name, false));
            rows.len() - 1
        }
    };
    &mut rows[position]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LineItem, Purchase};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn add(ledger: &mut Ledger, buyer: &str, day: u32, cents: i64, split: &[&str]) {
        let cost = Money::from_cents(cents);
        let item = LineItem::even_split("Shared", cost, Decimal::ZERO, split).unwrap();
        let purchase = Purchase::new(buyer, "Store", date(day), cost, vec![item]).unwrap();
        ledger.add_purchase(purchase).unwrap();
    }

    #[test]
    fn empty_ledger_yields_zero_for_everyone() {
        let ledger = Ledger::with_participants(["A", "B"]).unwrap();
        let balances = BalanceService::compute_balances(&ledger, DateWindow::unbounded());
        assert_eq!(balances.len(), 2);
        assert!(balances.iter().all(|(_, amount)| amount.is_zero()));
    }

    #[test]
    fn half_split_makes_other_participant_owe_half() {
        let mut ledger = Ledger::with_participants(["A", "B"]).unwrap();
        add(&mut ledger, "A", 1, 10_000, &["A", "B"]);
        let balances = BalanceService::compute_balances(&ledger, DateWindow::unbounded());
        assert_eq!(balances.get("A"), Some(Money::new(dec!(50))));
        assert_eq!(balances.get("B"), Some(Money::new(dec!(-50))));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let mut ledger = Ledger::with_participants(["A", "B"]).unwrap();
        add(&mut ledger, "A", 1, 1_000, &["B"]);
        add(&mut ledger, "A", 5, 2_000, &["B"]);
        add(&mut ledger, "A", 9, 4_000, &["B"]);
        let window = DateWindow::new(date(1), date(5)).unwrap();
        let balances = BalanceService::compute_balances(&ledger, window);
        assert_eq!(balances.get("B"), Some(Money::from_cents(-3_000)));
    }

    #[test]
    fn orphaned_share_falls_back_to_buyer() {
        let mut ledger = Ledger::with_participants(["A", "B", "C"]).unwrap();
        add(&mut ledger, "A", 1, 3_000, &["A", "B", "C"]);
        ledger.remove_participant("C").unwrap();

        let rows = BalanceService::summarize(&ledger, DateWindow::unbounded());
        assert_eq!(rows.len(), 2);
        let a = &rows[0];
        assert_eq!(a.paid, Money::from_cents(3_000));
        assert_eq!(a.owed.round_cents(), Money::from_cents(2_000));
        let balances = BalanceService::compute_balances(&ledger, DateWindow::unbounded());
        assert!(balances.total().within(Money::from_cents(1)));
    }

    #[test]
    fn removed_buyer_still_gets_credit() {
        let mut ledger = Ledger::with_participants(["A", "B"]).unwrap();
        add(&mut ledger, "B", 1, 1_000, &["A"]);
        ledger.remove_participant("B").unwrap();

        let rows = BalanceService::summarize(&ledger, DateWindow::unbounded());
        let b = rows.iter().find(|row| row.participant == "B").expect("B row kept");
        assert!(!b.on_roster);
        assert_eq!(b.balance(), Money::from_cents(1_000));
    }
}
