//! Audit logging for record submissions
//!
//! Every submission attempt is appended to `audit.log` as one JSON line:
//! when it is sent, when it is confirmed, or when it fails. Entries describe
//! the record (side, tag, month) and the transaction, never the clear amount.
//!
//! # Example
//!
//! ```rust,ignore
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::submitted(submission, &scope, &record, tx_hash))?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, AuditScope, Operation};
pub use logger::AuditLogger;
