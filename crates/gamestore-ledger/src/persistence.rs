//! # Persistence Adapter
//!
//! Loads and saves one serialized document under one key. No business
//! logic: bytes in, bytes out.

use std::sync::Arc;

use crate::error::StorageResult;
use crate::storage::KeyValueStore;

/// A key-value store bound to a single key.
#[derive(Debug, Clone)]
pub struct SnapshotPersistence {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SnapshotPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        SnapshotPersistence {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The last saved document, if any.
    pub fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        self.store.get(&self.key)
    }

    pub fn save(&self, bytes: &[u8]) -> StorageResult<()> {
        self.store.put(&self.key, bytes)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.store.remove(&self.key)
    }
}
