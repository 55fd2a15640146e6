//! Display formatting for terminal output
//!
//! Provides utilities for formatting snapshots, records and reports for
//! terminal display.

pub mod ledger;
pub mod record;
pub mod report;

pub use ledger::{format_identity, format_status, format_value_line};
pub use record::{format_record_register, format_record_row};
