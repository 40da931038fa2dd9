//! Tabular and text exports of a ledger snapshot.

use std::{fmt::Write as _, fs::File, io::Write, path::Path};

use serde::Serialize;

use crate::{
    core::services::{BalanceService, SettlementService},
    currency::CurrencyFormat,
    errors::LedgerError,
    ledger::{DateWindow, Ledger, LineItem},
};

/// One CSV row per line item.
#[derive(Debug, Serialize)]
struct ItemRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Buyer")]
    buyer: &'a str,
    #[serde(rename = "Store")]
    store: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Cost")]
    cost: String,
    #[serde(rename = "TaxRate")]
    tax_rate: String,
    #[serde(rename = "Total")]
    total: String,
    #[serde(rename = "SplitMap")]
    split_map: String,
}

/// Writes every line item of the purchases dated inside `window`, in ledger order.
pub fn write_csv<W: Write>(
    ledger: &Ledger,
    window: DateWindow,
    writer: W,
) -> Result<usize, LedgerError> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for purchase in ledger.purchases_in(window) {
        let date = purchase.date().format("%Y-%m-%d").to_string();
        for item in purchase.items() {
            csv.serialize(ItemRow {
                date: date.clone(),
                buyer: purchase.buyer(),
                store: purchase.store(),
                description: item.description(),
                cost: item.pre_tax_cost().to_string(),
                tax_rate: item.tax_rate().normalize().to_string(),
                total: item.total_cost().to_string(),
                split_map: render_splits(item),
            })?;
            rows += 1;
        }
    }
    if rows == 0 {
        csv.write_record([
            "Date",
            "Buyer",
            "Store",
            "Description",
            "Cost",
            "TaxRate",
            "Total",
            "SplitMap",
        ])?;
    }
    csv.flush()?;
    Ok(rows)
}

pub fn export_csv_to_path(
    ledger: &Ledger,
    window: DateWindow,
    path: &Path,
) -> Result<usize, LedgerError> {
    let file = File::create(path)?;
    let rows = write_csv(ledger, window, file)?;
    tracing::info!(path = %path.display(), rows, "csv export written");
    Ok(rows)
}

/// Human-readable settlement for `window`; defaults to the span of all purchases.
pub fn settlement_summary(
    ledger: &Ledger,
    window: Option<DateWindow>,
    format: &CurrencyFormat,
) -> String {
    let mut out = String::from("Settlement Summary\n");
    let window = match window.or_else(|| ledger.date_span()) {
        Some(window) => window,
        None => {
            out.push_str("No purchases recorded.\n");
            return out;
        }
    };
    let _ = writeln!(
        out,
        "Date range: {} to {}",
        window.start.format("%Y-%m-%d"),
        window.end.format("%Y-%m-%d")
    );

    let balances = BalanceService::compute_balances(ledger, window);
    let plan = SettlementService::plan(&balances);
    if plan.payments.is_empty() {
        out.push_str("All settled up.\n");
    }
    for payment in &plan.payments {
        let _ = writeln!(
            out,
            "{} pays {} {}",
            payment.from,
            payment.to,
            format.format(payment.amount)
        );
    }
    for (participant, amount) in &plan.residuals {
        let _ = writeln!(
            out,
            "Warning: {} left unsettled at {}",
            participant,
            format.format(*amount)
        );
    }
    out
}

pub fn export_summary_to_path(
    ledger: &Ledger,
    window: Option<DateWindow>,
    format: &CurrencyFormat,
    path: &Path,
) -> Result<(), LedgerError> {
    let summary = settlement_summary(ledger, window, format);
    std::fs::write(path, summary)?;
    tracing::info!(path = %path.display(), "settlement summary written");
    Ok(())
}

/// Paid/owed/balance table, one line per participant.
pub fn balance_table(ledger: &Ledger, window: DateWindow, format: &CurrencyFormat) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16}{:>14}{:>14}{:>14}", "Participant", "Paid", "Owed", "Balance");
    for row in BalanceService::summarize(ledger, window) {
        let _ = writeln!(
            out,
            "{:<16}{:>14}{:>14}{:>14}",
            row.participant,
            format.format(row.paid),
            format.format(row.owed),
            format.format(row.balance())
        );
    }
    out
}

fn render_splits(item: &LineItem) -> String {
    let parts: Vec<String> = item
        .splits()
        .iter()
        .map(|(name, ratio)| format!("{}={}", name, ratio.normalize()))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
