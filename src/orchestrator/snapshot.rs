//! Read-only view of the orchestrator's state
//!
//! Presentation and aggregation only ever see a `LedgerSnapshot`, taken
//! between completed transitions. `values` only holds clear values that are
//! fresh for the handle in `handles`.

use std::collections::BTreeMap;

use super::context::SessionIdentity;
use super::status::{QueryPhase, StatusMessage};
use crate::models::{ClearScalar, EncryptedHandle, LogicalQuery, RecordEntry, RecordMeta};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub identity: SessionIdentity,
    pub handles: BTreeMap<LogicalQuery, EncryptedHandle>,
    /// Fresh clear values only
    pub values: BTreeMap<LogicalQuery, ClearScalar>,
    pub phases: BTreeMap<LogicalQuery, QueryPhase>,
    /// Metadata of the caller's records, in index order
    pub records: Vec<RecordMeta>,
    pub status: Option<StatusMessage>,
    pub fetch_in_flight: bool,
    pub decrypt_in_flight: bool,
}

impl LedgerSnapshot {
    pub fn handle(&self, query: &LogicalQuery) -> Option<EncryptedHandle> {
        self.handles.get(query).copied()
    }

    /// Fresh clear value for a query
    pub fn value(&self, query: &LogicalQuery) -> Option<ClearScalar> {
        self.values.get(query).copied()
    }

    /// Numeric fresh value, 0 when missing or stale
    pub fn amount(&self, query: &LogicalQuery) -> u64 {
        self.value(query).map(|v| v.as_u64()).unwrap_or(0)
    }

    pub fn phase(&self, query: &LogicalQuery) -> QueryPhase {
        self.phases.get(query).copied().unwrap_or_default()
    }

    pub fn is_decrypted(&self, query: &LogicalQuery) -> bool {
        self.values.contains_key(query)
    }

    pub fn is_deployed(&self) -> bool {
        self.identity.is_deployed()
    }

    /// A handle refresh may start
    pub fn can_query(&self) -> bool {
        self.is_deployed() && self.identity.signer.is_some() && !self.fetch_in_flight
    }

    /// A decryption may start
    pub fn can_decrypt(&self) -> bool {
        self.can_query() && !self.decrypt_in_flight
    }

    /// Records joined with their amount handles and fresh amounts
    pub fn record_entries(&self) -> Vec<RecordEntry> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, meta)| {
                let query = LogicalQuery::RecordAmount {
                    index: index as u64,
                };
                RecordEntry {
                    index: index as u64,
                    meta: meta.clone(),
                    amount_handle: self.handle(&query),
                    amount: self.value(&query),
                }
            })
            .collect()
    }
}
