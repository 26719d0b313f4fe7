//! In-memory storage backend.
//!
//! Clones share the same map, so a test can hand one clone to the
//! [`StateStore`](crate::store::StateStore) and inspect the raw bytes
//! through another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::app::ports::{StorageError, StoragePort};

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(&Self::composite_key(namespace, key)).cloned())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }
}
