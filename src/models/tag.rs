//! Record sides and the tag catalog
//!
//! Every record is either income or an expense and carries one tag from the
//! fixed list for its side. The lists are ordered; breakdowns preserve that
//! order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BillsError, BillsResult};

/// Expense tags, in display order
pub const EXPENSE_TAGS: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Rent",
    "Shopping",
    "Entertainment",
    "Healthcare",
    "Education",
    "Others",
];

/// Income tags, in display order
pub const INCOME_TAGS: &[&str] = &["Salary", "Bonus", "Investment", "Others"];

/// Which side of the ledger a record or aggregate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSide {
    Income,
    Expense,
}

impl RecordSide {
    /// Side from the ledger's `isIncome` flag
    pub fn from_is_income(is_income: bool) -> Self {
        if is_income {
            Self::Income
        } else {
            Self::Expense
        }
    }

    /// The ledger's `isIncome` flag
    pub fn is_income(&self) -> bool {
        matches!(self, Self::Income)
    }

    /// Tag names valid for this side
    pub fn tag_names(&self) -> &'static [&'static str] {
        match self {
            Self::Income => INCOME_TAGS,
            Self::Expense => EXPENSE_TAGS,
        }
    }

    /// All tags of this side, in display order
    pub fn tags(&self) -> Vec<Tag> {
        self.tag_names().iter().map(|name| Tag(name.to_string())).collect()
    }
}

impl fmt::Display for RecordSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

/// A tag from the catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Resolve a tag name for a side (case-insensitive) to its canonical form
    pub fn for_side(side: RecordSide, name: &str) -> BillsResult<Self> {
        let wanted = name.trim();
        side.tag_names()
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(wanted))
            .map(|canonical| Self(canonical.to_string()))
            .ok_or_else(|| {
                BillsError::validation(format!(
                    "Unknown {} tag '{}'. Valid tags: {}",
                    side.to_string().to_lowercase(),
                    wanted,
                    side.tag_names().join(", ")
                ))
            })
    }

    /// Wrap a tag name returned by the ledger without validation
    pub fn from_ledger(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The tag name as sent to the ledger
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lists_are_ordered() {
        let tags = RecordSide::Expense.tags();
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[0].as_str(), "Food & Dining");
        assert_eq!(tags[7].as_str(), "Others");
        assert_eq!(RecordSide::Income.tags()[0].as_str(), "Salary");
    }

    #[test]
    fn test_for_side_is_case_insensitive() {
        let tag = Tag::for_side(RecordSide::Income, "salary").unwrap();
        assert_eq!(tag.as_str(), "Salary");
    }

    #[test]
    fn test_tag_must_match_side() {
        let err = Tag::for_side(RecordSide::Income, "Rent").unwrap_err();
        assert!(err.is_validation());
        assert!(Tag::for_side(RecordSide::Expense, "Rent").is_ok());
        assert!(Tag::for_side(RecordSide::Expense, "Others").is_ok());
        assert!(Tag::for_side(RecordSide::Income, "Others").is_ok());
    }

    #[test]
    fn test_side_flags() {
        assert_eq!(RecordSide::from_is_income(true), RecordSide::Income);
        assert!(!RecordSide::Expense.is_income());
    }
}
