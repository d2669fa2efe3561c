//! # Storage Module
//!
//! Byte-level key-value stores behind the persistence adapter.
//!
//! ## Storage Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LedgerStore / CartProjection                                          │
//! │       │                                                                 │
//! │       │  persistence.save(bytes)                                       │
//! │       ▼                                                                 │
//! │  KeyValueStore (trait)                                                 │
//! │  ├── get(&self, key)   -> Option<bytes>                                │
//! │  ├── put(&self, key, bytes)                                            │
//! │  └── remove(&self, key)                                                │
//! │       │                                                                 │
//! │       ├──► MemoryKeyValueStore   tests, ephemeral sessions             │
//! │       └──► FileKeyValueStore     one file per key, temp + rename       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stores know nothing about snapshots or carts; they move opaque bytes.

pub mod file;
pub mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use crate::error::StorageResult;

/// A synchronous byte store addressed by string keys.
///
/// Implementations must make `put` atomic per key: a reader sees either the
/// previous value or the new one.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
