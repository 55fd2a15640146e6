//! Ledger records
//!
//! `NewRecord` is the validated input of a submission; `RecordMeta` is the
//! clear metadata the ledger returns for an existing record (the amount stays
//! encrypted behind a handle).

use serde::{Deserialize, Serialize};

use super::{ClearScalar, EncryptedHandle, MonthKey, RecordSide, Tag};
use crate::error::{BillsError, BillsResult};

/// A record about to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Amount in whole currency units, encrypted client-side before submission
    pub amount: u64,
    pub side: RecordSide,
    pub tag: Tag,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub month: MonthKey,
}

impl NewRecord {
    /// Validate and build a new record
    pub fn new(
        amount: u64,
        side: RecordSide,
        tag: &str,
        timestamp: u64,
        month: MonthKey,
    ) -> BillsResult<Self> {
        if amount == 0 {
            return Err(BillsError::validation("Amount must be greater than zero"));
        }
        let tag = Tag::for_side(side, tag)?;
        Ok(Self {
            amount,
            side,
            tag,
            timestamp,
            month,
        })
    }
}

/// Clear metadata of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub is_income: bool,
    pub timestamp: u64,
    pub tag: String,
    pub month_key: u32,
}

impl RecordMeta {
    /// Side of the record
    pub fn side(&self) -> RecordSide {
        RecordSide::from_is_income(self.is_income)
    }
}

/// One row of a record listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub index: u64,
    pub meta: RecordMeta,
    pub amount_handle: Option<EncryptedHandle>,
    /// Present only while fresh for `amount_handle`
    pub amount: Option<ClearScalar>,
}
