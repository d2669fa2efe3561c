//! # Ledger Crate Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StorageError ──► LedgerError::PersistenceFailure                      │
//! │  ConfigError      (startup only; never crosses the commit path)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger operations return [`gamestore_core::LedgerError`].

use std::path::PathBuf;

use gamestore_core::LedgerError;
use thiserror::Error;

/// Result type alias for key-value store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key cannot be mapped to a storage slot.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Store refused the write.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        LedgerError::PersistenceFailure(err.to_string())
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
