//! Record display formatting
//!
//! Register view of the caller's records. Amounts are only shown while a
//! fresh clear value exists; otherwise the row shows the handle prefix.

use chrono::DateTime;

use crate::models::RecordEntry;

use super::report::truncate;

/// Format a single record for display (register row)
pub fn format_record_row(entry: &RecordEntry, currency_symbol: &str) -> String {
    let side_icon = if entry.meta.is_income { "+" } else { "-" };
    let date = i64::try_from(entry.meta.timestamp)
        .ok()
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "?".to_string());
    let amount = match (&entry.amount, &entry.amount_handle) {
        (Some(value), _) => format!("{}{}{}", side_icon, currency_symbol, value),
        (None, Some(handle)) => format!("*** {}", handle.short()),
        (None, None) => "***".to_string(),
    };

    format!(
        "{:>4} {:10} {:7} {:16} {:>20}",
        entry.index,
        date,
        entry.meta.month_key,
        truncate(&entry.meta.tag, 16),
        amount
    )
}

/// Format a list of records as a register
pub fn format_record_register(entries: &[RecordEntry], currency_symbol: &str) -> String {
    if entries.is_empty() {
        return "No records found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:>4} {:10} {:7} {:16} {:>20}\n",
        "#", "Date", "Month", "Tag", "Amount"
    ));
    output.push_str(&"-".repeat(61));
    output.push('\n');

    for entry in entries {
        output.push_str(&format_record_row(entry, currency_symbol));
        output.push('\n');
    }

    output
}
