//! Decrypted values per logical query

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{BillsError, BillsResult};
use crate::models::{ClearScalar, ClearValue, EncryptedHandle, LogicalQuery};

/// Map from query to the last value decrypted for it
///
/// Values are never purged on refresh. A reader always passes the query's
/// current handle and only gets a value decrypted from that exact handle.
#[derive(Debug, Default)]
pub struct ClearValueCache {
    values: RwLock<HashMap<LogicalQuery, ClearValue>>,
}

impl ClearValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> BillsResult<RwLockReadGuard<'_, HashMap<LogicalQuery, ClearValue>>> {
        self.values
            .read()
            .map_err(|e| BillsError::Storage(format!("Clear value cache lock poisoned: {}", e)))
    }

    fn write(&self) -> BillsResult<RwLockWriteGuard<'_, HashMap<LogicalQuery, ClearValue>>> {
        self.values
            .write()
            .map_err(|e| BillsError::Storage(format!("Clear value cache lock poisoned: {}", e)))
    }

    /// The value for `query` if it was decrypted from `current`
    pub fn get_fresh(
        &self,
        query: &LogicalQuery,
        current: Option<&EncryptedHandle>,
    ) -> BillsResult<Option<ClearScalar>> {
        Ok(self
            .read()?
            .get(query)
            .filter(|value| value.is_fresh_for(current))
            .map(|value| value.value))
    }

    /// Store values, replacing older ones
    pub fn commit<I>(&self, entries: I) -> BillsResult<()>
    where
        I: IntoIterator<Item = (LogicalQuery, ClearValue)>,
    {
        self.write()?.extend(entries);
        Ok(())
    }

    pub fn clear(&self) -> BillsResult<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Ordered copy of all entries, fresh or not
    pub fn snapshot(&self) -> BillsResult<BTreeMap<LogicalQuery, ClearValue>> {
        Ok(self.read()?.iter().map(|(q, v)| (q.clone(), *v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_hidden_once_handle_moves_on() {
        let cache = ClearValueCache::new();
        let h1 = EncryptedHandle::from_bytes([1; 32]);
        let h2 = EncryptedHandle::from_bytes([2; 32]);
        cache
            .commit([(LogicalQuery::Balance, ClearValue::new(h1, ClearScalar::Uint(500)))])
            .unwrap();

        assert_eq!(
            cache.get_fresh(&LogicalQuery::Balance, Some(&h1)).unwrap(),
            Some(ClearScalar::Uint(500))
        );
        assert_eq!(cache.get_fresh(&LogicalQuery::Balance, Some(&h2)).unwrap(), None);
        assert_eq!(cache.get_fresh(&LogicalQuery::Balance, None).unwrap(), None);
        // still stored, just not presentable
        assert_eq!(cache.snapshot().unwrap().len(), 1);
    }
}
