//! CLI commands for reports
//!
//! Tag breakdowns of one month, printed or exported to a file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};

use crate::error::{BillsError, BillsResult};
use crate::models::RecordSide;
use crate::reports::Breakdown;

use super::ledger::month_arg;
use super::session::Session;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Yaml,
}

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Expense breakdown by tag
    Expenses {
        /// Month to report on (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,

        /// Export to a file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },

    /// Income breakdown by tag
    Income {
        /// Month to report on (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,

        /// Export to a file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },
}

/// Handle report commands
pub async fn handle_report_command(session: &Session, cmd: ReportCommands) -> BillsResult<()> {
    let (side, month, output, format) = match cmd {
        ReportCommands::Expenses {
            month,
            output,
            format,
        } => (RecordSide::Expense, month, output, format),
        ReportCommands::Income {
            month,
            output,
            format,
        } => (RecordSide::Income, month, output, format),
    };
    let month = month_arg(month)?;

    let breakdown = session
        .orchestrator()
        .compute_breakdown(side, month)
        .await?;

    match output {
        Some(path) => {
            export_breakdown(&breakdown, &path, format)?;
            println!("{} report exported to: {}", side, path.display());
        }
        None => print!("{}", breakdown.format_terminal(session.currency())),
    }
    session.print_status()
}

fn export_breakdown(
    breakdown: &Breakdown,
    path: &Path,
    format: ExportFormat,
) -> BillsResult<()> {
    let file = File::create(path).map_err(|e| {
        BillsError::Export(format!("Failed to create file {}: {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Csv => breakdown.export_csv(&mut writer)?,
        ExportFormat::Json => breakdown.export_json(&mut writer)?,
        ExportFormat::Yaml => breakdown.export_yaml(&mut writer)?,
    }
    writer
        .flush()
        .map_err(|e| BillsError::Export(format!("Failed to write {}: {}", path.display(), e)))
}
