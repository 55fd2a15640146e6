//! Monthly summary
//!
//! Joins the encrypted monthly net with the per-tag totals of both sides.
//! The ledger keeps the net and the tag totals as independent encrypted
//! aggregates, so they can disagree; the summary reports the mismatch
//! instead of hiding it.

use serde::Serialize;

use crate::models::{LogicalQuery, MonthKey, RecordSide};
use crate::orchestrator::LedgerSnapshot;

use super::Breakdown;

/// Net and side totals of one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    /// Decrypted monthly net; the ledger computes it with wrapping `u64`
    /// arithmetic, so a negative month shows up as a large value
    pub net: Option<u64>,
    pub income_total: u128,
    pub expense_total: u128,
    /// Every queried value was fresh
    pub complete: bool,
}

impl MonthlySummary {
    /// Build from a snapshot holding the month's net and tag totals
    pub fn compute(month: MonthKey, snapshot: &LedgerSnapshot) -> Self {
        let income = Breakdown::compute(
            RecordSide::Income,
            month,
            &RecordSide::Income.tags(),
            snapshot,
        );
        let expense = Breakdown::compute(
            RecordSide::Expense,
            month,
            &RecordSide::Expense.tags(),
            snapshot,
        );
        let net = snapshot
            .value(&LogicalQuery::MonthlyNet { month })
            .map(|v| v.as_u64());

        Self {
            month,
            net,
            income_total: income.total(),
            expense_total: expense.total(),
            complete: net.is_some() && income.is_complete() && expense.is_complete(),
        }
    }

    /// Every query needed for a summary of `month`
    pub fn queries(month: MonthKey) -> Vec<LogicalQuery> {
        let mut queries = vec![LogicalQuery::MonthlyNet { month }];
        queries.extend(LogicalQuery::all_tags(RecordSide::Income, month));
        queries.extend(LogicalQuery::all_tags(RecordSide::Expense, month));
        queries
    }

    /// Net as a signed value, reading the wrapped `u64` as two's complement
    pub fn signed_net(&self) -> Option<i64> {
        self.net.map(|net| net as i64)
    }

    /// Net implied by the tag totals, reduced to the ledger's wrapping `u64`
    pub fn tag_net(&self) -> u64 {
        (self.income_total as u64).wrapping_sub(self.expense_total as u64)
    }

    /// Whether the decrypted net disagrees with the tag totals
    pub fn has_discrepancy(&self) -> bool {
        self.complete && self.net != Some(self.tag_net())
    }

    /// Format the summary for terminal display
    pub fn format_terminal(&self, currency_symbol: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("Monthly Summary: {}\n", self.month));
        output.push_str(&"=".repeat(40));
        output.push('\n');

        let net = match self.signed_net() {
            Some(net) if net < 0 => format!("-{}{}", currency_symbol, net.unsigned_abs()),
            Some(net) => format!("{}{}", currency_symbol, net),
            None => "***".to_string(),
        };
        output.push_str(&format!("{:<16} {:>20}\n", "Net:", net));
        output.push_str(&format!(
            "{:<16} {:>20}\n",
            "Income (tags):",
            format!("{}{}", currency_symbol, self.income_total)
        ));
        output.push_str(&format!(
            "{:<16} {:>20}\n",
            "Expense (tags):",
            format!("{}{}", currency_symbol, self.expense_total)
        ));

        if self.has_discrepancy() {
            output.push_str(&format!(
                "\nWarning: net differs from income minus expense by tag ({})\n",
                self.tag_net() as i64
            ));
        } else if !self.complete {
            output.push_str("\n*** not decrypted yet, counted as 0\n");
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClearScalar, Tag};

    fn month() -> MonthKey {
        MonthKey::new(202402).unwrap()
    }

    fn full_snapshot(net: u64, salary: u64, rent: u64) -> LedgerSnapshot {
        let mut snapshot = LedgerSnapshot::default();
        for query in MonthlySummary::queries(month()) {
            snapshot.values.insert(query, ClearScalar::Uint(0));
        }
        snapshot
            .values
            .insert(LogicalQuery::MonthlyNet { month: month() }, ClearScalar::Uint(net));
        snapshot.values.insert(
            LogicalQuery::by_tag(RecordSide::Income, month(), Tag::from_ledger("Salary")),
            ClearScalar::Uint(salary),
        );
        snapshot.values.insert(
            LogicalQuery::by_tag(RecordSide::Expense, month(), Tag::from_ledger("Rent")),
            ClearScalar::Uint(rent),
        );
        snapshot
    }

    #[test]
    fn test_consistent_month() {
        let summary = MonthlySummary::compute(month(), &full_snapshot(2000, 3000, 1000));
        assert!(summary.complete);
        assert!(!summary.has_discrepancy());
        assert_eq!(summary.signed_net(), Some(2000));
    }

    #[test]
    fn test_negative_net_wraps() {
        let wrapped = 0u64.wrapping_sub(500);
        let summary = MonthlySummary::compute(month(), &full_snapshot(wrapped, 0, 500));
        assert_eq!(summary.signed_net(), Some(-500));
        assert!(!summary.has_discrepancy());
        assert!(summary.format_terminal("$").contains("-$500"));
    }

    #[test]
    fn test_overflowing_tag_totals_match_wrapped_net() {
        let mut snapshot = full_snapshot(0, u64::MAX, 0);
        snapshot.values.insert(
            LogicalQuery::by_tag(RecordSide::Income, month(), Tag::from_ledger("Bonus")),
            ClearScalar::Uint(1),
        );

        let summary = MonthlySummary::compute(month(), &snapshot);
        assert_eq!(summary.income_total, u128::from(u64::MAX) + 1);
        assert_eq!(summary.tag_net(), 0);
        assert!(!summary.has_discrepancy());
    }

    #[test]
    fn test_discrepancy_is_reported() {
        let summary = MonthlySummary::compute(month(), &full_snapshot(10, 3000, 1000));
        assert!(summary.has_discrepancy());
        assert!(summary.format_terminal("$").contains("Warning"));
    }

    #[test]
    fn test_incomplete_summary_never_flags_discrepancy() {
        let summary = MonthlySummary::compute(month(), &LedgerSnapshot::default());
        assert!(!summary.complete);
        assert!(!summary.has_discrepancy());
        assert_eq!(summary.net, None);
    }

    #[test]
    fn test_queries_cover_net_and_both_sides() {
        assert_eq!(MonthlySummary::queries(month()).len(), 1 + 4 + 8);
    }
}
