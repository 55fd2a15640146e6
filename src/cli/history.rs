//! Submission history from the audit log

use crate::audit::AuditLogger;
use crate::config::BillsPaths;
use crate::error::BillsResult;

pub fn handle_history(paths: &BillsPaths, count: usize) -> BillsResult<()> {
    let logger = AuditLogger::new(paths.audit_log());
    let entries = logger.read_recent(count)?;

    if entries.is_empty() {
        println!("No submissions recorded yet.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", entry.format_human_readable());
    }
    Ok(())
}
