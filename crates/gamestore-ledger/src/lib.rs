//! # gamestore-ledger: Ledger Store for the Game Store
//!
//! Owns the authoritative ledger snapshot at runtime: serialized commits,
//! persistence, the per-account cart, and the facade the storefront UI calls.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Runtime                                   │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   Storefront (facade + latency)                  │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  │                              │                       │
//! │                  ▼                              ▼                       │
//! │  ┌────────────────────────────┐   ┌────────────────────────────────┐   │
//! │  │ CartProjection             │   │ LedgerStore                    │   │
//! │  │ per-account cart document  │──►│ one writer task, FIFO commits  │   │
//! │  │ follows SessionProvider    │   │ watch-published snapshots      │   │
//! │  └─────────────┬──────────────┘   └───────────────┬────────────────┘   │
//! │                │                                  │                     │
//! │                ▼                                  ▼                     │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │        KeyValueStore  (MemoryKeyValueStore / FileKeyValueStore)  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`store`] - `LedgerStore` commit queue
//! - [`persistence`] - Snapshot document load/save
//! - [`storage`] - Key-value byte stores
//! - [`cart`] - Session-scoped cart projection
//! - [`session`] - Signed-in account provider
//! - [`storefront`] - UI-facing facade
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Storage and configuration errors

pub mod cart;
pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod storage;
pub mod store;
pub mod storefront;
pub mod telemetry;

pub use cart::{Cart, CartEntry, CartProjection, CartView};
pub use config::LedgerConfig;
pub use error::{ConfigError, StorageError, StorageResult};
pub use persistence::SnapshotPersistence;
pub use session::{LocalSession, SessionProvider};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::LedgerStore;
pub use storefront::Storefront;
pub use telemetry::init_tracing;
