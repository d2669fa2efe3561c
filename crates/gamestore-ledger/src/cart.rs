//! # Cart Projection
//!
//! The signed-in account's cart: selected catalog items plus an optional
//! discount code, persisted per account.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Projection Operations                           │
//! │                                                                         │
//! │  Storefront Action        Projection Call         Cart Change          │
//! │  ─────────────────        ───────────────         ───────────          │
//! │                                                                         │
//! │  Click "Add" ────────────► add_item() ──────────► items ∪ {id}         │
//! │  Click "Remove" ─────────► remove_item() ───────► items − {id}         │
//! │  Enter code ─────────────► apply_discount() ────► discount = CODE      │
//! │  Clear code ─────────────► clear_discount() ────► discount = none      │
//! │  Empty cart ─────────────► clear() ─────────────► items = ∅            │
//! │  View cart ──────────────► view() / summary() ──► (read only)          │
//! │  Checkout ───────────────► checkout() ──────────► Purchase, then       │
//! │                                                   − checked-out items  │
//! │                                                                         │
//! │  Prices are never frozen in the cart: view() and summary() re-read     │
//! │  the live catalog and discount codes on every call.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Scoping
//! The projection follows the [`SessionProvider`]: a new account loads its
//! stored cart, sign-out resets to anonymous and leaves the stored cart in
//! place for the next sign-in. Mutations while anonymous are `Unauthorized`.

use std::sync::{Arc, Mutex, Weak};

use gamestore_core::commerce::{quote, validate_discount, Purchase};
use gamestore_core::{
    CatalogItem, DiscountCode, LedgerError, LedgerResult, PurchaseReceipt, PurchaseSummary,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::session::SessionProvider;
use crate::storage::KeyValueStore;
use crate::store::LedgerStore;

// =============================================================================
// Cart Document
// =============================================================================

/// One selected catalog item. Quantity is always 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub catalog_item_id: String,
    pub quantity: u32,
}

impl CartEntry {
    fn new(catalog_item_id: &str) -> Self {
        CartEntry {
            catalog_item_id: catalog_item_id.to_string(),
            quantity: 1,
        }
    }
}

/// The persisted per-account cart document.
///
/// Entries whose catalog item was deleted are kept; they are skipped when
/// pricing and reappear if an item with the same id is created again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

impl Cart {
    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|e| e.catalog_item_id == item_id)
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|e| e.catalog_item_id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops what `checked_out` held: its entries, and its discount code if
    /// that is still the one applied.
    fn settle_checkout(&mut self, checked_out: &Cart) {
        self.items.retain(|e| !checked_out.contains(&e.catalog_item_id));
        if self.discount_code.is_some() && self.discount_code == checked_out.discount_code {
            self.discount_code = None;
        }
    }
}

/// What the storefront renders for the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Live catalog entries, in catalog order.
    pub items: Vec<CatalogItem>,
    pub discount_code: Option<String>,
    pub summary: PurchaseSummary,
}

// =============================================================================
// Projection
// =============================================================================

#[derive(Debug, Default)]
struct CartState {
    account_id: Option<String>,
    cart: Cart,
}

/// Session-scoped cart backed by the ledger's live snapshot.
#[derive(Debug)]
pub struct CartProjection {
    ledger: LedgerStore,
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    state: Mutex<CartState>,
    listener: Mutex<Option<AbortHandle>>,
}

impl CartProjection {
    pub fn new(
        ledger: LedgerStore,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn KeyValueStore>,
        key_prefix: impl Into<String>,
    ) -> Self {
        let projection = CartProjection {
            ledger,
            session,
            store,
            key_prefix: key_prefix.into(),
            state: Mutex::new(CartState::default()),
            listener: Mutex::new(None),
        };
        projection.sync_session();
        projection
    }

    /// Reloads the cart whenever the session changes. The task is aborted
    /// when the projection is dropped; a previous listener is replaced.
    pub fn spawn_session_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut changes = self.session.subscribe();

        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                match weak.upgrade() {
                    Some(projection) => projection.sync_session(),
                    None => break,
                }
            }
        });

        let previous = self
            .listener
            .lock()
            .expect("Listener mutex poisoned")
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
        handle
    }

    fn storage_key(&self, account_id: &str) -> String {
        format!("{}:{}", self.key_prefix, account_id)
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartState) -> R,
    {
        let mut state = self.state.lock().expect("Cart mutex poisoned");
        f(&mut state)
    }

    /// Aligns the in-memory cart with the current session.
    fn sync_session(&self) {
        let current = self.session.current_account_id();
        self.with_state(|state| {
            if state.account_id == current {
                return;
            }
            state.cart = match &current {
                Some(account_id) => self.load(account_id),
                None => Cart::default(),
            };
            debug!(account_id = ?current, items = state.cart.items.len(), "Cart switched account");
            state.account_id = current;
        });
    }

    /// Stored cart for `account_id`; unreadable documents are discarded.
    fn load(&self, account_id: &str) -> Cart {
        let key = self.storage_key(account_id);
        match self.store.get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(key = %key, error = %e, "Stored cart is unreadable; clearing");
                    if let Err(e) = self.store.remove(&key) {
                        warn!(key = %key, error = %e, "Failed to remove unreadable cart");
                    }
                    Cart::default()
                }
            },
            Ok(None) => Cart::default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read stored cart");
                Cart::default()
            }
        }
    }

    fn save(&self, account_id: &str, cart: &Cart) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(cart)
            .map_err(|e| LedgerError::PersistenceFailure(format!("Failed to encode cart: {}", e)))?;
        self.store.put(&self.storage_key(account_id), &bytes)?;
        Ok(())
    }

    /// Applies `change` to a copy of the signed-in cart, saves it, then
    /// keeps it. Nothing changes if `change` or the save fails.
    fn update<F, R>(&self, change: F) -> LedgerResult<R>
    where
        F: FnOnce(&str, &mut Cart) -> LedgerResult<R>,
    {
        self.sync_session();
        self.with_state(|state| {
            let account_id = state
                .account_id
                .clone()
                .ok_or_else(|| LedgerError::Unauthorized("Please login first".to_string()))?;

            let mut next = state.cart.clone();
            let output = change(&account_id, &mut next)?;
            if next != state.cart {
                self.save(&account_id, &next)?;
                state.cart = next;
            }
            Ok(output)
        })
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds a catalog item; adding one already in the cart is a no-op.
    pub fn add_item(&self, item_id: &str) -> LedgerResult<()> {
        let snapshot = self.ledger.read();
        self.update(|_, cart| {
            if snapshot.item(item_id).is_none() {
                return Err(LedgerError::not_found("Catalog item", item_id));
            }
            if !cart.contains(item_id) {
                cart.items.push(CartEntry::new(item_id));
            }
            Ok(())
        })
    }

    pub fn remove_item(&self, item_id: &str) -> LedgerResult<()> {
        self.update(|_, cart| {
            cart.items.retain(|e| e.catalog_item_id != item_id);
            Ok(())
        })
    }

    /// Validates `code` for the signed-in account and stores its canonical
    /// form. No usage is consumed until checkout.
    pub fn apply_discount(&self, code: &str) -> LedgerResult<DiscountCode> {
        let snapshot = self.ledger.read();
        let now = self.ledger.clock().now();
        self.update(|account_id, cart| {
            if code.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "discount code".to_string(),
                }
                .into());
            }
            let discount = validate_discount(&snapshot, account_id, code, now)?;
            cart.discount_code = Some(discount.code.clone());
            Ok(discount)
        })
    }

    pub fn clear_discount(&self) -> LedgerResult<()> {
        self.update(|_, cart| {
            cart.discount_code = None;
            Ok(())
        })
    }

    /// Empties the cart, including its discount code.
    pub fn clear(&self) -> LedgerResult<()> {
        self.update(|_, cart| {
            *cart = Cart::default();
            Ok(())
        })
    }

    // -------------------------------------------------------------------------
    // Derived Views
    // -------------------------------------------------------------------------

    /// The raw cart document of the current session.
    pub fn cart(&self) -> Cart {
        self.sync_session();
        self.with_state(|state| state.cart.clone())
    }

    pub fn account_id(&self) -> Option<String> {
        self.sync_session();
        self.with_state(|state| state.account_id.clone())
    }

    /// Priced summary from the live catalog and discount codes.
    pub fn summary(&self) -> PurchaseSummary {
        self.view().summary
    }

    pub fn view(&self) -> CartView {
        self.sync_session();
        let (signed_in, cart) = self.with_state(|state| (state.account_id.is_some(), state.cart.clone()));

        if !signed_in || cart.is_empty() {
            return CartView {
                items: Vec::new(),
                discount_code: cart.discount_code,
                summary: PurchaseSummary::empty(),
            };
        }

        let snapshot = self.ledger.read();
        let items: Vec<CatalogItem> = snapshot
            .catalog_items
            .iter()
            .filter(|item| cart.contains(&item.id))
            .cloned()
            .collect();
        let summary = quote(&snapshot, &cart.item_ids(), cart.discount_code.as_deref());

        CartView {
            items,
            discount_code: cart.discount_code,
            summary,
        }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Purchases the cart's live items with its discount code, then removes
    /// what was checked out. Entries added meanwhile stay in the cart.
    ///
    /// The purchase is queued on the first poll; dropping the future after
    /// that does not cancel it.
    pub async fn checkout(&self) -> LedgerResult<PurchaseReceipt> {
        self.sync_session();
        let (account_id, cart) = self.with_state(|state| (state.account_id.clone(), state.cart.clone()));
        let account_id =
            account_id.ok_or_else(|| LedgerError::Unauthorized("Please login first".to_string()))?;

        let snapshot = self.ledger.read();
        let item_ids: Vec<String> = cart
            .item_ids()
            .into_iter()
            .filter(|id| snapshot.item(id).is_some())
            .collect();

        let receipt = self
            .ledger
            .apply(Purchase {
                account_id: account_id.clone(),
                item_ids,
                discount_code: cart.discount_code.clone(),
            })
            .await?;

        // The purchase is committed; a failure to save the settled cart is
        // not a checkout failure.
        self.with_state(|state| {
            let remaining = if state.account_id.as_deref() == Some(account_id.as_str()) {
                state.cart.settle_checkout(&cart);
                state.cart.clone()
            } else {
                let mut stored = self.load(&account_id);
                stored.settle_checkout(&cart);
                stored
            };
            if let Err(e) = self.save(&account_id, &remaining) {
                warn!(account_id = %account_id, error = %e, "Failed to save cart after checkout");
            }
        });

        debug!(account_id = %account_id, tx = %receipt.transaction.id, "Checkout complete");
        Ok(receipt)
    }
}

impl Drop for CartProjection {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .map(Option::take)
            .unwrap_or_else(|poisoned| poisoned.into_inner().take());
        if let Some(listener) = listener {
            listener.abort();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use gamestore_core::commerce::{CreateCatalogItem, DeleteCatalogItem};
    use gamestore_core::seed::{ADMIN_ACCOUNT_ID, DEMO_ACCOUNT_ID};
    use std::time::Duration;

    use gamestore_core::{Money, SystemClock};

    use super::*;
    use crate::persistence::SnapshotPersistence;
    use crate::session::LocalSession;
    use crate::storage::MemoryKeyValueStore;

    struct Fixture {
        ledger: LedgerStore,
        session: Arc<LocalSession>,
        kv: Arc<MemoryKeyValueStore>,
        cart: Arc<CartProjection>,
    }

    async fn fixture() -> Fixture {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let ledger = LedgerStore::open(
            SnapshotPersistence::new(kv.clone(), "ledger"),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();
        let session = Arc::new(LocalSession::new());
        let cart = Arc::new(CartProjection::new(
            ledger.clone(),
            session.clone(),
            kv.clone(),
            "cart",
        ));
        Fixture {
            ledger,
            session,
            kv,
            cart,
        }
    }

    #[tokio::test]
    async fn test_anonymous_mutations_are_unauthorized() {
        let f = fixture().await;
        let err = f.cart.add_item("game_bal").unwrap_err();
        assert_eq!(err, LedgerError::Unauthorized("Please login first".to_string()));
        assert!(f.cart.clear().is_err());
        assert_eq!(f.cart.summary(), PurchaseSummary::empty());
    }

    #[tokio::test]
    async fn test_add_is_idempotent_and_persisted() {
        let f = fixture().await;
        f.session.sign_in(ADMIN_ACCOUNT_ID);

        f.cart.add_item("game_bal").unwrap();
        f.cart.add_item("game_bal").unwrap();
        f.cart.add_item("game_cities").unwrap();

        assert_eq!(f.cart.cart().items.len(), 2);
        let stored: Cart =
            serde_json::from_slice(&f.kv.get("cart:admin_root").unwrap().unwrap()).unwrap();
        assert_eq!(stored, f.cart.cart());

        assert!(matches!(
            f.cart.add_item("game_nope").unwrap_err(),
            LedgerError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_summary_follows_live_prices() {
        let f = fixture().await;
        f.session.sign_in(ADMIN_ACCOUNT_ID);
        f.cart.add_item("game_stardew").unwrap();
        f.cart.apply_discount(" bigspender ").unwrap();
        assert_eq!(f.cart.cart().discount_code.as_deref(), Some("BIGSPENDER"));

        let summary = f.cart.summary();
        assert_eq!(summary.total_before_discount, Money::from_cents(45_000));
        assert_eq!(summary.discount_amount, Money::from_cents(6_750));

        f.ledger
            .apply(gamestore_core::commerce::UpdateCatalogItem {
                item_id: "game_stardew".to_string(),
                price: Some(Money::from_cents(50_000)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(f.cart.summary().total_after_discount, Money::from_cents(42_500));
    }

    #[tokio::test]
    async fn test_apply_discount_rejections_leave_cart() {
        let f = fixture().await;
        f.session.sign_in(DEMO_ACCOUNT_ID);

        assert!(matches!(
            f.cart.apply_discount("   ").unwrap_err(),
            LedgerError::InvalidInput(_)
        ));
        assert!(matches!(
            f.cart.apply_discount("welcome10").unwrap_err(),
            LedgerError::LimitReached { .. }
        ));
        assert_eq!(f.cart.cart().discount_code, None);

        // Validation alone never consumes a use.
        f.cart.apply_discount("FLASH25").unwrap();
        assert_eq!(f.ledger.read().discount_by_code("FLASH25").unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn test_session_switch_loads_each_cart() {
        let f = fixture().await;
        let _listener = f.cart.spawn_session_listener();

        f.session.sign_in(ADMIN_ACCOUNT_ID);
        f.cart.add_item("game_bal").unwrap();

        f.session.sign_out();
        assert!(f.cart.view().items.is_empty());
        assert_eq!(f.cart.account_id(), None);

        f.session.sign_in(DEMO_ACCOUNT_ID);
        assert!(f.cart.cart().is_empty());

        f.session.sign_in(ADMIN_ACCOUNT_ID);
        assert!(f.cart.cart().contains("game_bal"));
    }

    #[tokio::test]
    async fn test_corrupt_stored_cart_is_discarded() {
        let f = fixture().await;
        f.kv.put("cart:user_demo", b"[broken").unwrap();

        f.session.sign_in(DEMO_ACCOUNT_ID);
        assert!(f.cart.cart().is_empty());
        assert_eq!(f.kv.get("cart:user_demo").unwrap(), None);
    }

    #[tokio::test]
    async fn test_deleted_items_are_skipped_then_return() {
        let f = fixture().await;
        f.session.sign_in(ADMIN_ACCOUNT_ID);
        f.cart.add_item("game_bal").unwrap();
        f.cart.add_item("game_cities").unwrap();

        f.ledger
            .apply(DeleteCatalogItem {
                item_id: "game_bal".to_string(),
            })
            .await
            .unwrap();

        let view = f.cart.view();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.summary.total_before_discount, Money::from_cents(65_000));
        // Not pruned from the stored cart.
        assert!(f.cart.cart().contains("game_bal"));

        // Recreating an item under the same id brings the entry back.
        let base = f.ledger.read();
        let mut recreated = base.catalog_items[0].clone();
        recreated.id = "game_bal".to_string();
        f.ledger
            .commit(move |draft, _| {
                draft.catalog_items.push(recreated);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(f.cart.view().items.len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_purchases_and_clears() {
        let f = fixture().await;
        f.session.sign_in(ADMIN_ACCOUNT_ID);

        let created = f
            .ledger
            .apply(CreateCatalogItem {
                title: "Hollow Knight".to_string(),
                description: String::new(),
                price: Money::from_cents(10_000),
                category: "Indie".to_string(),
                cover_image: None,
            })
            .await
            .unwrap();
        f.cart.add_item(&created.id).unwrap();
        f.cart.add_item("game_cities").unwrap();
        f.cart.apply_discount("BIGSPENDER").unwrap();

        let receipt = f.cart.checkout().await.unwrap();
        assert_eq!(receipt.summary.total_before_discount, Money::from_cents(75_000));
        assert_eq!(receipt.summary.discount_amount, Money::from_cents(11_250));
        assert!(receipt.owned_item_ids.contains(&created.id));

        assert!(f.cart.cart().is_empty());
        let stored: Cart =
            serde_json::from_slice(&f.kv.get("cart:admin_root").unwrap().unwrap()).unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_checkout_keeps_items_added_meanwhile() {
        let f = fixture().await;
        f.session.sign_in(ADMIN_ACCOUNT_ID);
        f.cart.add_item("game_bal").unwrap();
        f.cart.apply_discount("BIGSPENDER").unwrap();

        // Holds the writer so the purchase stays queued.
        let slow = f.ledger.commit(|_, _| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        });

        let mut checkout = Box::pin(f.cart.checkout());
        assert!(tokio::time::timeout(Duration::from_millis(1), &mut checkout)
            .await
            .is_err());
        f.cart.add_item("game_cities").unwrap();

        let receipt = checkout.await.unwrap();
        slow.await.unwrap();
        assert_eq!(
            receipt.transaction.details.unwrap().item_ids,
            vec!["game_bal".to_string()]
        );

        let cart = f.cart.cart();
        assert!(cart.contains("game_cities"));
        assert!(!cart.contains("game_bal"));
        assert_eq!(cart.discount_code, None);
        let stored: Cart =
            serde_json::from_slice(&f.kv.get("cart:admin_root").unwrap().unwrap()).unwrap();
        assert_eq!(stored, cart);
    }

    #[tokio::test]
    async fn test_dropping_projection_stops_listener() {
        let f = fixture().await;
        let listener = f.cart.spawn_session_listener();

        drop(f.cart);
        let err = listener.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let f = fixture().await;
        f.session.sign_in(DEMO_ACCOUNT_ID);
        f.cart.add_item("game_mhw").unwrap();
        f.cart.add_item("game_cod6").unwrap();

        let err = f.cart.checkout().await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(f.cart.cart().items.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_checkout() {
        let f = fixture().await;
        f.session.sign_in(DEMO_ACCOUNT_ID);
        assert_eq!(f.cart.checkout().await.unwrap_err(), LedgerError::EmptySelection);
    }
}
