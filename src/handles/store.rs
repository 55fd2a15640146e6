//! Current encrypted handle per logical query

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{BillsError, BillsResult};
use crate::models::{EncryptedHandle, LogicalQuery};
use crate::orchestrator::FlightLane;

/// Map from query to the handle the ledger last returned for it
///
/// The store owns the fetch lane: only one refresh can write through it at a
/// time.
#[derive(Debug)]
pub struct HandleStore {
    handles: RwLock<HashMap<LogicalQuery, EncryptedHandle>>,
    fetch_lane: FlightLane,
}

impl Default for HandleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleStore {
    pub fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            fetch_lane: FlightLane::new("fetch"),
        }
    }

    pub fn fetch_lane(&self) -> &FlightLane {
        &self.fetch_lane
    }

    fn read(&self) -> BillsResult<RwLockReadGuard<'_, HashMap<LogicalQuery, EncryptedHandle>>> {
        self.handles
            .read()
            .map_err(|e| BillsError::Storage(format!("Handle store lock poisoned: {}", e)))
    }

    fn write(&self) -> BillsResult<RwLockWriteGuard<'_, HashMap<LogicalQuery, EncryptedHandle>>> {
        self.handles
            .write()
            .map_err(|e| BillsError::Storage(format!("Handle store lock poisoned: {}", e)))
    }

    /// Current handle for a query
    pub fn get(&self, query: &LogicalQuery) -> BillsResult<Option<EncryptedHandle>> {
        Ok(self.read()?.get(query).copied())
    }

    /// Replace the handles of the given queries
    pub fn commit<I>(&self, entries: I) -> BillsResult<()>
    where
        I: IntoIterator<Item = (LogicalQuery, EncryptedHandle)>,
    {
        let mut handles = self.write()?;
        handles.extend(entries);
        Ok(())
    }

    /// Forget every handle
    pub fn clear(&self) -> BillsResult<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Ordered copy of all handles
    pub fn snapshot(&self) -> BillsResult<BTreeMap<LogicalQuery, EncryptedHandle>> {
        Ok(self.read()?.iter().map(|(q, h)| (q.clone(), *h)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthKey;

    #[test]
    fn test_commit_replaces() {
        let store = HandleStore::new();
        store
            .commit([(LogicalQuery::Balance, EncryptedHandle::from_bytes([1; 32]))])
            .unwrap();
        store
            .commit([(LogicalQuery::Balance, EncryptedHandle::from_bytes([2; 32]))])
            .unwrap();

        assert_eq!(
            store.get(&LogicalQuery::Balance).unwrap(),
            Some(EncryptedHandle::from_bytes([2; 32]))
        );
        let month = MonthKey::new(202401).unwrap();
        assert_eq!(store.get(&LogicalQuery::MonthlyNet { month }).unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let store = HandleStore::new();
        store
            .commit([(LogicalQuery::Balance, EncryptedHandle::from_bytes([1; 32]))])
            .unwrap();
        store.clear().unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }
}
