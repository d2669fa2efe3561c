//! # Ledger Seeder
//!
//! Writes a freshly seeded ledger snapshot into the data directory,
//! replacing whatever was stored there.
//!
//! ## Usage
//! ```bash
//! # Seed the configured data directory
//! cargo run -p gamestore-ledger --bin seed
//!
//! # Seed a specific directory
//! cargo run -p gamestore-ledger --bin seed -- --data-dir ./data
//!
//! # Read settings from a config file
//! cargo run -p gamestore-ledger --bin seed -- --config ./ledger.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use gamestore_core::seed::default_snapshot;
use gamestore_core::{Clock, SystemClock};
use gamestore_ledger::{init_tracing, FileKeyValueStore, LedgerConfig, SnapshotPersistence};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut data_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data-dir" | "-d" => {
                if i + 1 < args.len() {
                    data_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Game Store Ledger Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --data-dir <PATH>  Data directory (default: from config)");
                println!("  -c, --config <PATH>    Config file (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }

    println!("🌱 Game Store Ledger Seeder");
    println!("===========================");
    println!("Data directory: {}", config.data_dir.display());
    println!("Snapshot key:   {}", config.snapshot_key);
    println!();

    let store = Arc::new(FileKeyValueStore::open(&config.data_dir)?);
    let persistence = SnapshotPersistence::new(store, config.snapshot_key.clone());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let snapshot = tokio::task::spawn_blocking(move || default_snapshot(clock.now())).await??;
    persistence.save(&snapshot.encode()?)?;

    info!(
        accounts = snapshot.accounts.len(),
        items = snapshot.catalog_items.len(),
        discounts = snapshot.discount_codes.len(),
        "Seeded ledger snapshot"
    );

    println!("✅ Seeded {} accounts, {} games, {} discount codes",
        snapshot.accounts.len(),
        snapshot.catalog_items.len(),
        snapshot.discount_codes.len()
    );
    println!("   Sign in as admin/admin123 or demo/demo123");

    Ok(())
}
