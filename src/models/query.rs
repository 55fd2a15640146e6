//! Logical queries
//!
//! A `LogicalQuery` names *what* is being asked of the ledger. Handles and
//! clear values are cached per query, never per raw handle.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MonthKey, RecordSide, Tag};

/// A key identifying one encrypted value the ledger can be asked for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LogicalQuery {
    /// The caller's running balance
    Balance,
    /// Income minus expense for one month
    MonthlyNet { month: MonthKey },
    /// Expense total for one tag in one month
    ExpenseByTag { month: MonthKey, tag: Tag },
    /// Income total for one tag in one month
    IncomeByTag { month: MonthKey, tag: Tag },
    /// Amount of the caller's n-th record
    RecordAmount { index: u64 },
}

impl LogicalQuery {
    /// Per-tag query for the given side
    pub fn by_tag(side: RecordSide, month: MonthKey, tag: Tag) -> Self {
        match side {
            RecordSide::Expense => Self::ExpenseByTag { month, tag },
            RecordSide::Income => Self::IncomeByTag { month, tag },
        }
    }

    /// One per-tag query for every tag of a side, in catalog order
    pub fn all_tags(side: RecordSide, month: MonthKey) -> Vec<Self> {
        side.tags()
            .into_iter()
            .map(|tag| Self::by_tag(side, month, tag))
            .collect()
    }

    /// Name of the ledger operation that answers this query
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Balance => "getMyBalance",
            Self::MonthlyNet { .. } => "getMyMonthlyNet",
            Self::ExpenseByTag { .. } => "getMyMonthlyExpenseByTag",
            Self::IncomeByTag { .. } => "getMyMonthlyIncomeByTag",
            Self::RecordAmount { .. } => "getMyRecordAmount",
        }
    }

    /// Month this query is partitioned by, if any
    pub fn month(&self) -> Option<MonthKey> {
        match self {
            Self::MonthlyNet { month }
            | Self::ExpenseByTag { month, .. }
            | Self::IncomeByTag { month, .. } => Some(*month),
            Self::Balance | Self::RecordAmount { .. } => None,
        }
    }
}

impl fmt::Display for LogicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Balance => write!(f, "balance"),
            Self::MonthlyNet { month } => write!(f, "net {}", month),
            Self::ExpenseByTag { month, tag } => write!(f, "expense {} [{}]", month, tag),
            Self::IncomeByTag { month, tag } => write!(f, "income {} [{}]", month, tag),
            Self::RecordAmount { index } => write!(f, "record #{}", index),
        }
    }
}
