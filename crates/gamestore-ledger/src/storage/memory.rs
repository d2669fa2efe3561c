use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StorageResult;

use super::KeyValueStore;

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("memory store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let entries = self.entries.read().expect("memory store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut entries = self.entries.write().expect("memory store lock poisoned");
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().expect("memory store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.put("k", b"one").unwrap();
        store.put("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"two"[..]));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }
}
