//! Audit entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Address, NewRecord, RecordSide, SubmissionId, TxHash};

/// Lifecycle step of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Transaction sent to the ledger
    Submitted,
    /// Transaction final and successful
    Confirmed,
    /// Encryption, submission or confirmation failed
    Failed,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Submitted => write!(f, "SUBMITTED"),
            Operation::Confirmed => write!(f, "CONFIRMED"),
            Operation::Failed => write!(f, "FAILED"),
        }
    }
}

/// Where a submission was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditScope {
    pub chain_id: u64,
    pub contract: Address,
    pub signer: Address,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the step happened (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    /// Groups the entries of one submission
    pub submission_id: SubmissionId,

    #[serde(flatten)]
    pub scope: AuditScope,

    pub side: RecordSide,
    pub tag: String,
    pub month_key: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    fn new(
        operation: Operation,
        submission_id: SubmissionId,
        scope: &AuditScope,
        record: &NewRecord,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            submission_id,
            scope: *scope,
            side: record.side,
            tag: record.tag.to_string(),
            month_key: record.month.value(),
            tx_hash: None,
            error: None,
        }
    }

    /// The transaction was sent
    pub fn submitted(
        submission_id: SubmissionId,
        scope: &AuditScope,
        record: &NewRecord,
        tx_hash: TxHash,
    ) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            ..Self::new(Operation::Submitted, submission_id, scope, record)
        }
    }

    /// The transaction is final
    pub fn confirmed(
        submission_id: SubmissionId,
        scope: &AuditScope,
        record: &NewRecord,
        tx_hash: TxHash,
    ) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            ..Self::new(Operation::Confirmed, submission_id, scope, record)
        }
    }

    /// Some step failed
    pub fn failed(
        submission_id: SubmissionId,
        scope: &AuditScope,
        record: &NewRecord,
        tx_hash: Option<TxHash>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tx_hash,
            error: Some(error.into()),
            ..Self::new(Operation::Failed, submission_id, scope, record)
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.submission_id,
            self.side,
            self.tag,
            self.month_key
        );

        if let Some(tx) = &self.tx_hash {
            output.push_str(&format!(" tx {}", tx.short()));
        }

        if let Some(error) = &self.error {
            output.push_str(&format!("\n  Error: {}", error));
        }

        output
    }
}
