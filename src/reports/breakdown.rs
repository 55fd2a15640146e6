//! Per-tag breakdown
//!
//! Aggregates the decrypted per-tag totals of one month into amounts and
//! shares. Computation is pure: it reads a `LedgerSnapshot` and never fetches
//! or decrypts anything. A tag without a fresh clear value counts as 0.

use serde::Serialize;
use std::io::Write;

use crate::display::report::{format_bar, format_percentage, truncate};
use crate::error::{BillsError, BillsResult};
use crate::models::{LogicalQuery, MonthKey, RecordSide, Tag};
use crate::orchestrator::LedgerSnapshot;

/// Width of the share bar in terminal output
const BAR_WIDTH: usize = 20;

/// One tag of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownItem {
    pub tag: Tag,
    /// Fresh clear total, 0 when not decrypted
    pub amount: u64,
    /// Share of the breakdown total in `[0, 1]`
    pub percent: f64,
    /// Whether `amount` comes from a fresh clear value
    pub decrypted: bool,
}

/// Per-tag totals of one side for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub side: RecordSide,
    pub month: MonthKey,
    /// One item per requested tag, in request order
    pub items: Vec<BreakdownItem>,
}

// u128 cannot overflow for any realistic tag count of u64 amounts
fn wide_sum(amounts: impl Iterator<Item = u64>) -> u128 {
    amounts.map(u128::from).sum()
}

impl Breakdown {
    /// Aggregate `tags` of `side` for `month` from a snapshot
    ///
    /// Shares are computed against the sum over exactly `tags`; they add up
    /// to 1.0, or are all 0.0 when the sum is zero.
    pub fn compute(
        side: RecordSide,
        month: MonthKey,
        tags: &[Tag],
        snapshot: &LedgerSnapshot,
    ) -> Self {
        let amounts: Vec<(Tag, Option<u64>)> = tags
            .iter()
            .map(|tag| {
                let query = LogicalQuery::by_tag(side, month, tag.clone());
                (tag.clone(), snapshot.value(&query).map(|v| v.as_u64()))
            })
            .collect();

        let sum = wide_sum(amounts.iter().map(|(_, amount)| amount.unwrap_or(0)));

        let items = amounts
            .into_iter()
            .map(|(tag, amount)| {
                let percent = if sum == 0 {
                    0.0
                } else {
                    amount.unwrap_or(0) as f64 / sum as f64
                };
                BreakdownItem {
                    tag,
                    amount: amount.unwrap_or(0),
                    percent,
                    decrypted: amount.is_some(),
                }
            })
            .collect();

        Self { side, month, items }
    }

    /// Sum of all item amounts, the denominator behind every share
    pub fn total(&self) -> u128 {
        wide_sum(self.items.iter().map(|item| item.amount))
    }

    /// Whether every tag had a fresh clear value
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|item| item.decrypted)
    }

    /// Format the breakdown for terminal display
    pub fn format_terminal(&self, currency_symbol: &str) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} by Tag: {}\n", self.side, self.month));
        output.push_str(&"=".repeat(64));
        output.push('\n');
        output.push_str(&format!(
            "{:<18} {:>14} {:>7}  {}\n",
            "Tag", "Amount", "%", "Share"
        ));
        output.push_str(&"-".repeat(64));
        output.push('\n');

        let max = self
            .items
            .iter()
            .map(|item| item.amount)
            .max()
            .unwrap_or(0) as f64;

        for item in &self.items {
            let amount = if item.decrypted {
                format!("{}{}", currency_symbol, item.amount)
            } else {
                "***".to_string()
            };
            output.push_str(&format!(
                "{:<18} {:>14} {:>7}  {}\n",
                truncate(item.tag.as_str(), 18),
                amount,
                format_percentage(item.percent * 100.0),
                format_bar(item.amount as f64, max, BAR_WIDTH)
            ));
        }

        output.push_str(&"-".repeat(64));
        output.push('\n');
        output.push_str(&format!(
            "{:<18} {:>14}\n",
            "Total",
            format!("{}{}", currency_symbol, self.total())
        ));
        if !self.is_complete() {
            output.push_str("\n*** not decrypted yet, counted as 0\n");
        }

        output
    }

    /// Export the breakdown to CSV format
    pub fn export_csv<W: Write>(&self, writer: W) -> BillsResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["Month", "Side", "Tag", "Amount", "Percentage", "Decrypted"])
            .map_err(|e| BillsError::Export(e.to_string()))?;

        for item in &self.items {
            csv.write_record([
                self.month.to_string(),
                self.side.to_string(),
                item.tag.to_string(),
                item.amount.to_string(),
                format!("{:.2}", item.percent * 100.0),
                item.decrypted.to_string(),
            ])
            .map_err(|e| BillsError::Export(e.to_string()))?;
        }

        csv.flush().map_err(|e| BillsError::Export(e.to_string()))?;
        Ok(())
    }

    /// Export the breakdown as pretty-printed JSON
    pub fn export_json<W: Write>(&self, writer: W) -> BillsResult<()> {
        serde_json::to_writer_pretty(writer, self).map_err(|e| BillsError::Export(e.to_string()))
    }

    /// Export the breakdown as YAML
    pub fn export_yaml<W: Write>(&self, writer: W) -> BillsResult<()> {
        serde_yaml::to_writer(writer, self).map_err(|e| BillsError::Export(e.to_string()))
    }
}
