//! Month keys
//!
//! The ledger partitions monthly aggregates by an integer `year * 100 + month`
//! (e.g. `202401`). Zero and out-of-range keys cannot be constructed, so an
//! invalid month never reaches the ledger.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BillsError, BillsResult};

/// Smallest year accepted in a month key
const MIN_YEAR: u32 = 1970;
/// Largest year accepted in a month key
const MAX_YEAR: u32 = 9999;

/// A validated `year * 100 + month` partition key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MonthKey(u32);

impl MonthKey {
    /// Validate a raw month key
    pub fn new(raw: u32) -> BillsResult<Self> {
        let year = raw / 100;
        let month = raw % 100;
        if raw == 0 {
            return Err(BillsError::validation("Month key must not be zero"));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(BillsError::validation(format!(
                "Invalid month key {}: expected YYYYMM",
                raw
            )));
        }
        Ok(Self(raw))
    }

    /// Build a key from a year and a month (1-12)
    pub fn from_year_month(year: u32, month: u32) -> BillsResult<Self> {
        Self::new(year.saturating_mul(100).saturating_add(month))
    }

    /// The month containing the given date
    pub fn from_date(date: NaiveDate) -> BillsResult<Self> {
        let year = u32::try_from(date.year())
            .map_err(|_| BillsError::validation(format!("Year out of range: {}", date.year())))?;
        Self::from_year_month(year, date.month())
    }

    /// The current local month
    pub fn current() -> BillsResult<Self> {
        Self::from_date(chrono::Local::now().date_naive())
    }

    /// Parse `YYYY-MM` (the month picker format) or a raw `YYYYMM` key
    pub fn parse(s: &str) -> BillsResult<Self> {
        let s = s.trim();
        let invalid = || BillsError::validation(format!("Invalid month '{}'. Use YYYY-MM", s));

        if let Some((year, month)) = s.split_once('-') {
            if year.len() != 4 || month.len() != 2 {
                return Err(invalid());
            }
            let year: u32 = year.parse().map_err(|_| invalid())?;
            let month: u32 = month.parse().map_err(|_| invalid())?;
            return Self::from_year_month(year, month);
        }

        if s.len() == 6 {
            let raw: u32 = s.parse().map_err(|_| invalid())?;
            return Self::new(raw);
        }

        Err(invalid())
    }

    /// The raw `YYYYMM` value sent to the ledger
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Calendar year
    pub const fn year(&self) -> u32 {
        self.0 / 100
    }

    /// Calendar month (1-12)
    pub const fn month(&self) -> u32 {
        self.0 % 100
    }
}

impl TryFrom<u32> for MonthKey {
    type Error = BillsError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<MonthKey> for u32 {
    fn from(key: MonthKey) -> Self {
        key.0
    }
}

impl FromStr for MonthKey {
    type Err = BillsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}
