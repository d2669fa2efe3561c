//! # Ledger Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     GAMESTORE_DATA_DIR=/var/lib/gamestore                              │
//! │     GAMESTORE_SNAPSHOT_KEY=gamestore-ledger-v1                         │
//! │     GAMESTORE_CART_PREFIX=gamestore-cart                               │
//! │     GAMESTORE_LATENCY_MS=0                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/gamestore/ledger.toml (Linux)                            │
//! │     ~/Library/Application Support/dev.gamestore.ledger/ledger.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! data_dir = "/var/lib/gamestore"
//! snapshot_key = "gamestore-ledger-v1"
//! cart_key_prefix = "gamestore-cart"
//! latency_ms = 200
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Upper bound on the simulated latency.
pub const MAX_LATENCY_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory of the file-backed store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Key of the ledger snapshot document.
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,

    /// Cart documents live under `{cart_key_prefix}:{account_id}`.
    #[serde(default = "default_cart_key_prefix")]
    pub cart_key_prefix: String,

    /// Delay applied to every storefront operation.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "gamestore", "ledger")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("gamestore-data"))
}

fn default_snapshot_key() -> String {
    "gamestore-ledger-v1".to_string()
}

fn default_cart_key_prefix() -> String {
    "gamestore-cart".to_string()
}

fn default_latency_ms() -> u64 {
    200
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            data_dir: default_data_dir(),
            snapshot_key: default_snapshot_key(),
            cart_key_prefix: default_cart_key_prefix(),
            latency_ms: default_latency_ms(),
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`ledger.toml`), if it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_key.trim().is_empty() {
            return Err(ConfigError::Invalid("snapshot_key must not be empty".into()));
        }
        if self.cart_key_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("cart_key_prefix must not be empty".into()));
        }
        if self.cart_key_prefix == self.snapshot_key {
            return Err(ConfigError::Invalid(
                "cart_key_prefix must differ from snapshot_key".into(),
            ));
        }
        if self.latency_ms > MAX_LATENCY_MS {
            return Err(ConfigError::Invalid(format!(
                "latency_ms must be at most {}, got {}",
                MAX_LATENCY_MS, self.latency_ms
            )));
        }
        Ok(())
    }

    /// Applies `GAMESTORE_*` overrides read through `var`.
    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("GAMESTORE_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data directory from environment");
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(key) = var("GAMESTORE_SNAPSHOT_KEY") {
            self.snapshot_key = key;
        }

        if let Some(prefix) = var("GAMESTORE_CART_PREFIX") {
            self.cart_key_prefix = prefix;
        }

        if let Some(latency) = var("GAMESTORE_LATENCY_MS") {
            match latency.parse::<u64>() {
                Ok(ms) => self.latency_ms = ms,
                Err(_) => warn!(value = %latency, "Ignoring unparsable GAMESTORE_LATENCY_MS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "gamestore", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}
