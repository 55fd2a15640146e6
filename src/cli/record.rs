//! Record CLI commands
//!
//! Adds encrypted records to the ledger and lists the caller's records.

use chrono::NaiveDate;
use clap::{ArgGroup, Subcommand};

use crate::display::format_record_register;
use crate::error::{BillsError, BillsResult};
use crate::models::{now_seconds, MonthKey, NewRecord, RecordSide};
use crate::orchestrator::SubmitOutcome;

use super::ledger::month_arg;
use super::session::Session;

/// Record subcommands
#[derive(Subcommand)]
pub enum RecordCommands {
    /// Add a record; the amount is encrypted before it leaves this machine
    #[command(group(ArgGroup::new("side").required(true).args(["income", "expense"])))]
    Add {
        /// Amount in whole currency units
        amount: u64,
        /// Record income
        #[arg(long)]
        income: bool,
        /// Record an expense
        #[arg(long)]
        expense: bool,
        /// Tag (see `bills tags`)
        #[arg(short, long)]
        tag: String,
        /// Month the record belongs to (YYYY-MM); defaults to the date's month
        #[arg(short, long)]
        month: Option<String>,
        /// Record date (YYYY-MM-DD); defaults to now
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List your records
    #[command(alias = "ls")]
    List {
        /// Decrypt the amounts
        #[arg(long)]
        decrypt: bool,
    },
}

/// Handle a record command
pub async fn handle_record_command(session: &Session, cmd: RecordCommands) -> BillsResult<()> {
    match cmd {
        RecordCommands::Add {
            amount,
            income,
            expense: _,
            tag,
            month,
            date,
        } => {
            let side = RecordSide::from_is_income(income);
            let (timestamp, month) = record_time(date, month)?;
            let record = NewRecord::new(amount, side, &tag, timestamp, month)?;
            add_record(session, record).await
        }
        RecordCommands::List { decrypt } => {
            let entries = session.orchestrator().list_records(decrypt).await?;
            print!("{}", format_record_register(&entries, session.currency()));
            session.print_status()
        }
    }
}

/// Print the tags each side accepts
pub fn handle_tags() {
    for side in [RecordSide::Expense, RecordSide::Income] {
        println!("{} tags:", side);
        for tag in side.tag_names() {
            println!("  {}", tag);
        }
    }
}

/// Timestamp and month of a new record
fn record_time(date: Option<String>, month: Option<String>) -> BillsResult<(u64, MonthKey)> {
    let Some(date) = date else {
        return Ok((now_seconds(), month_arg(month)?));
    };
    let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        BillsError::validation(format!("Invalid date format: {}. Use YYYY-MM-DD", date))
    })?;
    let timestamp = day
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| u64::try_from(midnight.and_utc().timestamp()).ok())
        .ok_or_else(|| BillsError::validation(format!("Date before 1970: {}", date)))?;
    let month = match month {
        Some(month) => MonthKey::parse(&month)?,
        None => MonthKey::from_date(day)?,
    };
    Ok((timestamp, month))
}

async fn add_record(session: &Session, record: NewRecord) -> BillsResult<()> {
    let summary = format!(
        "{} of {}{} [{}] for {}",
        record.side,
        session.currency(),
        record.amount,
        record.tag,
        record.month
    );

    match session.pipeline().submit(record).await? {
        SubmitOutcome::Confirmed {
            tx_hash, receipt, ..
        } => {
            println!("Recorded {}", summary);
            println!("  Tx:    {}", tx_hash);
            println!("  Block: {}", receipt.block_number);
            session.print_status()
        }
        SubmitOutcome::Busy => {
            println!("Another submission or refresh is in progress.");
            Ok(())
        }
        SubmitOutcome::Unavailable => session.print_status(),
        SubmitOutcome::Failed(message) => Err(BillsError::Call(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_time_from_date() {
        let (timestamp, month) = record_time(Some("2024-01-15".into()), None).unwrap();
        assert_eq!(timestamp, 1_705_276_800);
        assert_eq!(month.value(), 202401);
    }

    #[test]
    fn test_explicit_month_wins() {
        let (_, month) =
            record_time(Some("2024-01-31".into()), Some("2024-02".into())).unwrap();
        assert_eq!(month.value(), 202402);
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(record_time(Some("15/01/2024".into()), None)
            .unwrap_err()
            .is_validation());
    }
}
