//! # Ledger Snapshot
//!
//! The complete authoritative state of the store, as one value.
//!
//! ## Lifecycle
//! ```text
//!   persisted JSON ──decode──► Snapshot (published, immutable, Arc-shared)
//!                                   │
//!                                   │ clone  (copy-on-write draft)
//!                                   ▼
//!                              &mut Snapshot ──Mutation::apply──► draft'
//!                                                                   │
//!                                        check_invariants ◄─────────┤
//!                                        encode ──► save ──► publish
//! ```
//!
//! ## Wire Format
//! One camelCase JSON document:
//! `{ accounts[], catalogItems[], discountCodes[], transactions[], categories[] }`.
//! Missing arrays decode as empty.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{InvariantViolation, LedgerError, LedgerResult};
use crate::money::Money;
use crate::seed;
use crate::types::{Account, CatalogItem, DiscountCode, Transaction};

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub catalog_items: Vec<CatalogItem>,
    pub discount_codes: Vec<DiscountCode>,
    /// Append-only, oldest first.
    pub transactions: Vec<Transaction>,
    pub categories: Vec<String>,
}

impl Snapshot {
    // -------------------------------------------------------------------------
    // Codec
    // -------------------------------------------------------------------------

    /// Serializes to the persisted JSON document.
    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| LedgerError::PersistenceFailure(format!("Failed to encode snapshot: {}", e)))
    }

    /// Parses a persisted JSON document.
    ///
    /// A document with no categories gets the default category set.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut snapshot: Snapshot = serde_json::from_slice(bytes)?;
        if snapshot.categories.is_empty() {
            snapshot.categories = seed::default_categories();
        }
        Ok(snapshot)
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn account_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    /// Like [`Snapshot::account`] but fails with `NotFound`.
    pub fn require_account(&self, id: &str) -> LedgerResult<&Account> {
        self.account(id)
            .ok_or_else(|| LedgerError::not_found("Account", id))
    }

    pub fn require_account_mut(&mut self, id: &str) -> LedgerResult<&mut Account> {
        self.account_mut(id)
            .ok_or_else(|| LedgerError::not_found("Account", id))
    }

    /// Case-insensitive username lookup.
    pub fn account_by_username(&self, username: &str) -> Option<&Account> {
        let wanted = username.trim().to_lowercase();
        self.accounts
            .iter()
            .find(|a| a.username.to_lowercase() == wanted)
    }

    /// Case-insensitive email lookup.
    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        let wanted = email.trim().to_lowercase();
        self.accounts.iter().find(|a| a.email == wanted)
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub fn item(&self, id: &str) -> Option<&CatalogItem> {
        self.catalog_items.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut CatalogItem> {
        self.catalog_items.iter_mut().find(|i| i.id == id)
    }

    // -------------------------------------------------------------------------
    // Discounts
    // -------------------------------------------------------------------------

    pub fn discount(&self, id: &str) -> Option<&DiscountCode> {
        self.discount_codes.iter().find(|d| d.id == id)
    }

    /// Looks up a code by its canonical (upper-case) form.
    pub fn discount_by_code(&self, code: &str) -> Option<&DiscountCode> {
        let wanted = crate::validation::canonical_code(code);
        self.discount_codes.iter().find(|d| d.code == wanted)
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    pub fn transactions_for<'a>(
        &'a self,
        account_id: &'a str,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions
            .iter()
            .filter(move |t| t.account_id == account_id)
    }

    /// Balance implied by the transaction log: top-ups minus purchases.
    pub fn ledger_balance(&self, account_id: &str) -> Money {
        self.transactions_for(account_id)
            .map(Transaction::signed_amount)
            .sum()
    }

    // -------------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------------

    /// Verifies every ledger invariant.
    ///
    /// ## Checked
    /// ```text
    /// accounts      unique id, username (ci), email (ci); balance ≥ 0;
    ///               balance == Σ top-ups − Σ purchases;
    ///               owned ids resolve to catalog items
    /// catalog       unique id; price > 0
    /// discounts     unique id and code; used ≤ max;
    ///               per-account redemptions ≤ per-account limit
    /// transactions  unique id; account exists
    /// ```
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |msg: String| -> Result<(), InvariantViolation> {
            Err(InvariantViolation(msg))
        };

        let item_ids = unique_ids(self.catalog_items.iter().map(|i| i.id.as_str()), "catalog item")?;
        for item in &self.catalog_items {
            if !item.price.is_positive() {
                return violation(format!("catalog item {} has non-positive price", item.id));
            }
        }

        let mut usernames = HashSet::new();
        let mut emails = HashSet::new();
        unique_ids(self.accounts.iter().map(|a| a.id.as_str()), "account")?;
        for account in &self.accounts {
            if !usernames.insert(account.username.to_lowercase()) {
                return violation(format!("duplicate username {}", account.username));
            }
            if !emails.insert(account.email.to_lowercase()) {
                return violation(format!("duplicate email {}", account.email));
            }
            if account.wallet_balance.is_negative() {
                return violation(format!("account {} has a negative balance", account.id));
            }
            if let Some(missing) = account.owned_item_ids.iter().find(|id| !item_ids.contains(id.as_str())) {
                return violation(format!("account {} owns unknown item {}", account.id, missing));
            }
        }

        unique_ids(self.discount_codes.iter().map(|d| d.id.as_str()), "discount")?;
        let mut codes = HashSet::new();
        for discount in &self.discount_codes {
            if !codes.insert(discount.code.as_str()) {
                return violation(format!("duplicate discount code {}", discount.code));
            }
            if discount.used_count > discount.max_uses {
                return violation(format!("discount {} used beyond its cap", discount.code));
            }
            if let Some(account) = self
                .accounts
                .iter()
                .find(|a| a.redemptions_of(&discount.code) > discount.per_account_limit)
            {
                return violation(format!(
                    "account {} redeemed {} beyond its per-account limit",
                    account.id, discount.code
                ));
            }
        }

        unique_ids(self.transactions.iter().map(|t| t.id.as_str()), "transaction")?;
        let mut ledger: HashMap<&str, Money> = HashMap::new();
        for tx in &self.transactions {
            if self.account(&tx.account_id).is_none() {
                return violation(format!("transaction {} references unknown account", tx.id));
            }
            if tx.amount.is_negative() {
                return violation(format!("transaction {} has a negative amount", tx.id));
            }
            let running = ledger.entry(tx.account_id.as_str()).or_default();
            match running.checked_add(tx.signed_amount()) {
                Some(next) => *running = next,
                None => return violation(format!("ledger total for {} overflows", tx.account_id)),
            }
        }

        for account in &self.accounts {
            let expected = ledger.get(account.id.as_str()).copied().unwrap_or_default();
            if account.wallet_balance != expected {
                return violation(format!(
                    "account {} balance {} does not match ledger {}",
                    account.id, account.wallet_balance, expected
                ));
            }
        }

        Ok(())
    }
}

fn unique_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    entity: &str,
) -> Result<HashSet<&'a str>, InvariantViolation> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(InvariantViolation(format!("duplicate {} id {}", entity, id)));
        }
    }
    Ok(seen)
}

// =============================================================================
// Unit Tests
// =============================================================================
