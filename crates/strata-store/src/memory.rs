use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::traits::Storage;

/// In-memory, HashMap-based storage backend.
///
/// Intended for tests and embedding. All values live behind a `RwLock`;
/// reads and writes copy, so handed-out buffers never alias the store.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read_entries().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, sorted. Test helper.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read_entries()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn read_entries(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let entries = self.read_entries()?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))?;
        trace!(key, len = value.len(), "memory put");
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.read_entries()?.contains_key(key))
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("key_count", &self.len())
            .finish()
    }
}
