//! # File-Backed Store
//!
//! One file per key inside a data directory.
//!
//! ## Write Path
//! ```text
//! put("cart:usr_1", bytes)
//!      │
//!      ├── encode key  ──► cart%3Ausr_1.json
//!      ├── write bytes ──► cart%3Ausr_1.json.<uuid>.tmp
//!      ├── fsync
//!      └── rename      ──► cart%3Ausr_1.json      (atomic replace)
//! ```
//!
//! A crash mid-write leaves at most a stray `.tmp` file; the live file is
//! never half-written.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

use super::KeyValueStore;

#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(FileKeyValueStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to its file; bytes outside `[A-Za-z0-9_-]` are %-encoded
    /// so distinct keys never share a file.
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".to_string()));
        }

        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => name.push(byte as char),
                other => name.push_str(&format!("%{:02X}", other)),
            }
        }
        name.push_str(".json");

        Ok(self.dir.join(name))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::io(path, e));
        }

        debug!(key = %key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileKeyValueStore {
        let dir = std::env::temp_dir().join(format!("gamestore-kv-{}", Uuid::new_v4().simple()));
        FileKeyValueStore::open(dir).unwrap()
    }

    #[test]
    fn test_round_trip_and_overwrite() {
        let store = temp_store();
        assert_eq!(store.get("gamestore-ledger-v1").unwrap(), None);

        store.put("gamestore-ledger-v1", b"{\"a\":1}").unwrap();
        store.put("gamestore-ledger-v1", b"{\"a\":2}").unwrap();
        assert_eq!(
            store.get("gamestore-ledger-v1").unwrap().as_deref(),
            Some(&b"{\"a\":2}"[..])
        );

        // Only the live file remains.
        let files = fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(files, 1);

        store.remove("gamestore-ledger-v1").unwrap();
        store.remove("gamestore-ledger-v1").unwrap();
        assert_eq!(store.get("gamestore-ledger-v1").unwrap(), None);

        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn test_keys_do_not_collide() {
        let store = temp_store();
        store.put("cart:usr_1", b"colon").unwrap();
        store.put("cart-usr_1", b"dash").unwrap();
        store.put("../escape", b"dots").unwrap();

        assert_eq!(store.get("cart:usr_1").unwrap().as_deref(), Some(&b"colon"[..]));
        assert_eq!(store.get("cart-usr_1").unwrap().as_deref(), Some(&b"dash"[..]));
        assert!(store.dir().join("%2E%2E%2Fescape.json").exists());

        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let store = temp_store();
        assert!(matches!(store.put("", b"x"), Err(StorageError::InvalidKey(_))));
        fs::remove_dir_all(store.dir()).unwrap();
    }
}
