//! # Storefront Facade
//!
//! The single entry point the storefront UI calls. Every operation is
//! submitted to the ledger first and then held for the configured latency,
//! so a caller that gives up while waiting never aborts a queued commit.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Operation                               │
//! │                                                                         │
//! │  UI call ──► build request ──► LedgerStore::apply() ──► queued (FIFO)  │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                              sleep(latency)   ◄── 0 in tests           │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                              await commit outcome ──► UI               │
//! │                                                                         │
//! │  Queries read the published snapshot, then sleep the same latency.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use gamestore_core::commerce::{
    self, CreateCatalogItem, CreateDiscount, DeleteCatalogItem, DeleteDiscount, Purchase,
    RegisterAccount, TopUpWallet, UpdateCatalogItem, UpdateDiscount, UpdateProfile,
};
use gamestore_core::validation::canonical_code;
use gamestore_core::{
    AccountView, CatalogItem, Clock, DiscountCode, LedgerError, LedgerResult, Money, Mutation,
    PurchaseReceipt, PurchaseSummary, Snapshot, SystemClock, Transaction, DEFAULT_TOP_SELLERS,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cart::CartProjection;
use crate::config::LedgerConfig;
use crate::persistence::SnapshotPersistence;
use crate::session::SessionProvider;
use crate::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use crate::store::{seed_snapshot, LedgerStore};

/// Cart key prefix used when no config is supplied.
const DEFAULT_CART_PREFIX: &str = "gamestore-cart";
const DEFAULT_SNAPSHOT_KEY: &str = "gamestore-ledger-v1";

/// Cloneable handle over the ledger, its storage and the latency setting.
#[derive(Debug, Clone)]
pub struct Storefront {
    ledger: LedgerStore,
    store: Arc<dyn KeyValueStore>,
    cart_key_prefix: String,
    latency: Duration,
}

impl Storefront {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Opens the file-backed ledger described by `config`.
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        info!(data_dir = ?config.data_dir, key = %config.snapshot_key, "Opening storefront");
        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(&config.data_dir)?);
        Self::with_store(store, Arc::new(SystemClock), config).await
    }

    /// Opens a ledger over any key-value store.
    pub async fn with_store(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &LedgerConfig,
    ) -> LedgerResult<Self> {
        let persistence = SnapshotPersistence::new(store.clone(), config.snapshot_key.clone());
        let ledger = LedgerStore::open(persistence, clock).await?;

        Ok(Storefront {
            ledger,
            store,
            cart_key_prefix: config.cart_key_prefix.clone(),
            latency: config.latency(),
        })
    }

    /// A ledger held entirely in memory.
    pub async fn in_memory(clock: Arc<dyn Clock>, latency: Duration) -> LedgerResult<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let persistence = SnapshotPersistence::new(store.clone(), DEFAULT_SNAPSHOT_KEY);
        let ledger = LedgerStore::open(persistence, clock).await?;

        Ok(Storefront {
            ledger,
            store,
            cart_key_prefix: DEFAULT_CART_PREFIX.to_string(),
            latency,
        })
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// Observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.ledger.subscribe()
    }

    /// A cart that follows `session`, reloading on every sign-in change.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn cart(&self, session: Arc<dyn SessionProvider>) -> Arc<CartProjection> {
        let cart = Arc::new(CartProjection::new(
            self.ledger.clone(),
            session,
            self.store.clone(),
            self.cart_key_prefix.clone(),
        ));
        cart.spawn_session_listener();
        cart
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Queues `mutation`, waits out the latency, then awaits the outcome.
    async fn submit<M: Mutation>(&self, mutation: M) -> LedgerResult<M::Output> {
        let pending = self.ledger.apply(mutation);
        self.simulate_latency().await;
        pending.await
    }

    async fn respond<T>(&self, value: T) -> T {
        self.simulate_latency().await;
        value
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Creates a user account. The password is hashed before submission.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        avatar_url: Option<String>,
    ) -> LedgerResult<AccountView> {
        let (username, email, password) = (username.to_string(), email.to_string(), password.to_string());
        let request = tokio::task::spawn_blocking(move || {
            RegisterAccount::new(&username, &email, &password, avatar_url)
        })
        .await
        .map_err(|e| LedgerError::Credential(format!("Hashing task failed: {}", e)))??;

        debug!(username = %request.username(), "Registering account");
        self.submit(request).await
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> LedgerResult<AccountView> {
        let snapshot = self.ledger.read();
        let (username, password) = (username.to_string(), password.to_string());
        let outcome = tokio::task::spawn_blocking(move || {
            commerce::authenticate(&snapshot, &username, &password)
        })
        .await
        .map_err(|e| LedgerError::Credential(format!("Verification task failed: {}", e)))?;

        self.respond(outcome).await
    }

    pub async fn get_account(&self, account_id: &str) -> LedgerResult<AccountView> {
        let account = self.ledger.read().require_account(account_id).map(AccountView::from);
        self.respond(account).await
    }

    pub async fn list_accounts(&self) -> Vec<AccountView> {
        let accounts = self.ledger.read().accounts.iter().map(AccountView::from).collect();
        self.respond(accounts).await
    }

    pub async fn update_profile(&self, request: UpdateProfile) -> LedgerResult<AccountView> {
        self.submit(request).await
    }

    // =========================================================================
    // Wallet & Purchases
    // =========================================================================

    pub async fn top_up(&self, account_id: &str, amount: Money) -> LedgerResult<AccountView> {
        self.submit(TopUpWallet {
            account_id: account_id.to_string(),
            amount,
        })
        .await
    }

    /// Checks eligibility without consuming a use.
    pub async fn validate_discount(&self, account_id: &str, code: &str) -> LedgerResult<DiscountCode> {
        let snapshot = self.ledger.read();
        let outcome = commerce::validate_discount(&snapshot, account_id, code, self.ledger.clock().now());
        self.respond(outcome).await
    }

    /// Prices a selection against the live catalog without purchasing it.
    pub async fn quote(&self, item_ids: &[String], discount_code: Option<&str>) -> PurchaseSummary {
        let summary = commerce::quote(&self.ledger.read(), item_ids, discount_code);
        self.respond(summary).await
    }

    pub async fn purchase(
        &self,
        account_id: &str,
        item_ids: Vec<String>,
        discount_code: Option<String>,
    ) -> LedgerResult<PurchaseReceipt> {
        self.submit(Purchase {
            account_id: account_id.to_string(),
            item_ids,
            discount_code,
        })
        .await
    }

    /// Purchases the contents of `cart` and empties it.
    pub async fn checkout(&self, cart: &CartProjection) -> LedgerResult<PurchaseReceipt> {
        let receipt = cart.checkout().await;
        self.respond(receipt).await
    }

    /// Transactions, newest first; all accounts when `account_id` is `None`.
    pub async fn list_transactions(&self, account_id: Option<&str>) -> Vec<Transaction> {
        let snapshot = self.ledger.read();
        let transactions = snapshot
            .transactions
            .iter()
            .rev()
            .filter(|tx| account_id.map_or(true, |id| tx.account_id == id))
            .cloned()
            .collect();
        self.respond(transactions).await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn search_catalog(&self, term: &str, category: Option<&str>) -> Vec<CatalogItem> {
        let items = commerce::search_catalog(&self.ledger.read(), term, category);
        self.respond(items).await
    }

    pub async fn get_item(&self, item_id: &str) -> LedgerResult<CatalogItem> {
        let item = self
            .ledger
            .read()
            .item(item_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("Catalog item", item_id));
        self.respond(item).await
    }

    /// Best sellers; `None` uses the default count.
    pub async fn top_sellers(&self, limit: Option<usize>) -> Vec<CatalogItem> {
        let items = commerce::top_sellers(&self.ledger.read(), limit.unwrap_or(DEFAULT_TOP_SELLERS));
        self.respond(items).await
    }

    pub async fn categories(&self) -> Vec<String> {
        let categories = self.ledger.read().categories.clone();
        self.respond(categories).await
    }

    pub async fn create_item(&self, request: CreateCatalogItem) -> LedgerResult<CatalogItem> {
        self.submit(request).await
    }

    pub async fn update_item(&self, request: UpdateCatalogItem) -> LedgerResult<CatalogItem> {
        self.submit(request).await
    }

    pub async fn delete_item(&self, item_id: &str) -> LedgerResult<()> {
        self.submit(DeleteCatalogItem {
            item_id: item_id.to_string(),
        })
        .await
    }

    // =========================================================================
    // Discount Codes
    // =========================================================================

    pub async fn list_discounts(&self) -> Vec<DiscountCode> {
        let discounts = self.ledger.read().discount_codes.clone();
        self.respond(discounts).await
    }

    pub async fn discount_by_code(&self, code: &str) -> LedgerResult<DiscountCode> {
        let discount = self
            .ledger
            .read()
            .discount_by_code(code)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("Discount code", canonical_code(code)));
        self.respond(discount).await
    }

    pub async fn create_discount(&self, request: CreateDiscount) -> LedgerResult<DiscountCode> {
        self.submit(request).await
    }

    pub async fn update_discount(&self, request: UpdateDiscount) -> LedgerResult<DiscountCode> {
        self.submit(request).await
    }

    pub async fn delete_discount(&self, discount_id: &str) -> LedgerResult<()> {
        self.submit(DeleteDiscount {
            discount_id: discount_id.to_string(),
        })
        .await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Replaces every record with the default seed. Stored carts are kept.
    pub async fn reset_all(&self) -> LedgerResult<()> {
        info!("Resetting ledger to default seed");
        let fresh = seed_snapshot(self.ledger.clock().now()).await?;
        self.submit(commerce::ReplaceSnapshot(fresh)).await
    }
}

// =============================================================================
// Tests
// =============================================================================
