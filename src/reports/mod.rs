//! Reports for PrivateBills
//!
//! Pure aggregations over a `LedgerSnapshot`: per-tag breakdowns and the
//! monthly summary. Nothing here talks to the ledger.

pub mod breakdown;
pub mod summary;

pub use breakdown::{Breakdown, BreakdownItem};
pub use summary::MonthlySummary;
