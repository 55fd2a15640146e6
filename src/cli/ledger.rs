//! Balance and monthly CLI commands

use crate::display::format_value_line;
use crate::error::BillsResult;
use crate::models::{LogicalQuery, MonthKey};
use crate::orchestrator::{DecryptionOrchestrator, FetchOutcome};
use crate::reports::MonthlySummary;

use super::session::Session;

/// Refresh `queries` and, when asked and the refresh went through, decrypt them
pub async fn fetch_and_decrypt(
    orchestrator: &DecryptionOrchestrator,
    queries: &[LogicalQuery],
    decrypt: bool,
) -> BillsResult<()> {
    let fetched = orchestrator.refresh(queries).await?;
    if decrypt && matches!(fetched, FetchOutcome::Fetched { .. }) {
        orchestrator.decrypt(queries).await?;
    }
    Ok(())
}

/// Parse `--month`, defaulting to the current month
pub fn month_arg(month: Option<String>) -> BillsResult<MonthKey> {
    match month {
        Some(month) => MonthKey::parse(&month),
        None => MonthKey::current(),
    }
}

pub async fn handle_balance(session: &Session, decrypt: bool) -> BillsResult<()> {
    let query = LogicalQuery::Balance;
    fetch_and_decrypt(session.orchestrator(), std::slice::from_ref(&query), decrypt).await?;

    let snapshot = session.orchestrator().snapshot()?;
    println!(
        "{}",
        format_value_line("Balance", &query, &snapshot, session.currency())
    );
    session.print_status()
}

pub async fn handle_monthly(
    session: &Session,
    month: Option<String>,
    decrypt: bool,
) -> BillsResult<()> {
    let month = month_arg(month)?;
    let queries = MonthlySummary::queries(month);
    fetch_and_decrypt(session.orchestrator(), &queries, decrypt).await?;

    let snapshot = session.orchestrator().snapshot()?;
    let net = LogicalQuery::MonthlyNet { month };
    if decrypt {
        print!(
            "{}",
            MonthlySummary::compute(month, &snapshot).format_terminal(session.currency())
        );
    } else {
        println!(
            "{}",
            format_value_line("Net", &net, &snapshot, session.currency())
        );
    }
    session.print_status()
}
