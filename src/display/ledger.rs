//! Ledger value display
//!
//! Formats single encrypted values with their phase, the session identity
//! and the status line.

use crate::models::LogicalQuery;
use crate::orchestrator::{LedgerSnapshot, QueryPhase, SessionIdentity, StatusLevel, StatusMessage};

/// Format one value line: the clear value when fresh, otherwise the phase
pub fn format_value_line(
    label: &str,
    query: &LogicalQuery,
    snapshot: &LedgerSnapshot,
    currency_symbol: &str,
) -> String {
    let value = match (snapshot.value(query), snapshot.handle(query)) {
        (Some(value), _) => format!("{}{}", currency_symbol, value),
        (None, Some(handle)) => format!("*** ({}, {})", snapshot.phase(query), handle.short()),
        (None, None) if snapshot.phase(query) == QueryPhase::Idle => "-".to_string(),
        (None, None) => format!("*** ({})", snapshot.phase(query)),
    };
    format!("{:<16} {}", format!("{}:", label), value)
}

/// Format the session identity
pub fn format_identity(identity: &SessionIdentity) -> String {
    let contract = identity
        .contract
        .map(|c| c.to_string())
        .unwrap_or_else(|| "(not deployed)".to_string());
    let signer = identity
        .signer
        .map(|s| s.to_string())
        .unwrap_or_else(|| "(none)".to_string());

    format!(
        "Network:  chainId={}\nContract: {}\nSigner:   {}\n",
        identity.chain_id, contract, signer
    )
}

/// Format the status line, prefixed by its level
pub fn format_status(status: &StatusMessage) -> String {
    match status.level {
        StatusLevel::Info => status.text.clone(),
        StatusLevel::Advisory => format!("Note: {}", status.text),
        StatusLevel::Error => format!("Error: {}", status.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, ClearScalar, EncryptedHandle};

    #[test]
    fn test_value_line_states() {
        let mut snapshot = LedgerSnapshot::default();
        let query = LogicalQuery::Balance;
        assert!(format_value_line("Balance", &query, &snapshot, "$").ends_with('-'));

        snapshot
            .handles
            .insert(query.clone(), EncryptedHandle::from_bytes([7; 32]));
        snapshot.phases.insert(query.clone(), QueryPhase::Handled);
        assert!(format_value_line("Balance", &query, &snapshot, "$").contains("*** (encrypted"));

        snapshot.values.insert(query.clone(), ClearScalar::Uint(42));
        assert_eq!(
            format_value_line("Balance", &query, &snapshot, "$"),
            "Balance:         $42"
        );
    }

    #[test]
    fn test_identity_without_deployment() {
        let identity = SessionIdentity {
            chain_id: 11155111,
            contract: None,
            signer: Some(Address::from_bytes([1; 20])),
        };
        let output = format_identity(&identity);
        assert!(output.contains("chainId=11155111"));
        assert!(output.contains("(not deployed)"));
    }

    #[test]
    fn test_status_prefix() {
        assert_eq!(format_status(&StatusMessage::error("boom")), "Error: boom");
        assert_eq!(format_status(&StatusMessage::info("ok")), "ok");
    }
}
