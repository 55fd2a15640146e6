//! Custom error types for PrivateBills
//!
//! This module defines the error hierarchy for the client using thiserror.
//! Network-boundary failures are classified into the variants the
//! orchestrator knows how to recover from; everything else is local.

use thiserror::Error;

/// The main error type for PrivateBills operations
#[derive(Error, Debug)]
pub enum BillsError {
    /// No contract is registered for the active chain, or the contract at the
    /// resolved address does not expose the requested operation
    #[error("PrivateBills deployment not found for chainId={chain_id}")]
    NotDeployed { chain_id: u64 },

    /// Any other RPC or service failure
    #[error("Call failed: {0}")]
    Call(String),

    /// A decryption signature could not be created
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The session context changed while a request was in flight
    #[error("Result discarded: session context changed while request {request} was in flight")]
    StaleResult { request: String },

    /// Invalid input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Local storage errors (poisoned locks, unreadable files)
    #[error("Storage error: {0}")]
    Storage(String),

    /// At-rest encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Report export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl BillsError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a "not deployed" error for a chain
    pub fn not_deployed(chain_id: u64) -> Self {
        Self::NotDeployed { chain_id }
    }

    /// Check if this is a "not deployed" error
    pub fn is_not_deployed(&self) -> bool {
        matches!(self, Self::NotDeployed { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a stale-result discard
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleResult { .. })
    }
}

impl From<std::io::Error> for BillsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BillsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for PrivateBills operations
pub type BillsResult<T> = Result<T, BillsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BillsError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_deployed_error() {
        let err = BillsError::not_deployed(11155111);
        assert_eq!(
            err.to_string(),
            "PrivateBills deployment not found for chainId=11155111"
        );
        assert!(err.is_not_deployed());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_stale_result_error() {
        let err = BillsError::StaleResult {
            request: "req-1234abcd".into(),
        };
        assert!(err.is_stale());
        assert!(err.to_string().contains("req-1234abcd"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let bills_err: BillsError = io_err.into();
        assert!(matches!(bills_err, BillsError::Io(_)));
    }
}
