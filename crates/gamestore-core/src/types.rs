//! # Domain Types
//!
//! Ledger records used throughout the game store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Records                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │  CatalogItem    │   │  DiscountCode   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  username       │   │  title          │   │  code (UPPER)   │       │
//! │  │  wallet_balance │   │  price          │   │  percentage     │       │
//! │  │  owned_item_ids │◄──│  total_sales    │   │  used/max uses  │       │
//! │  │  redeemed_codes │   └─────────────────┘   └─────────────────┘       │
//! │  └────────▲────────┘                                                    │
//! │           │ account_id                                                  │
//! │  ┌────────┴────────┐                                                    │
//! │  │  Transaction    │   append-only; top-ups credit, purchases debit    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Redaction
//! [`Account`] carries the credential hash and never leaves the ledger.
//! Callers receive [`AccountView`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::credential::Credential;
use crate::money::Money;
use crate::pricing::PurchaseSummary;

// =============================================================================
// Role
// =============================================================================

/// Role tag carried by every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

// =============================================================================
// Account
// =============================================================================

/// A stored account, including its credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique, immutable identifier (`usr_...`).
    pub id: String,

    /// Display name; unique ignoring case.
    pub username: String,

    /// Stored lower-case; unique.
    pub email: String,

    pub role: Role,

    /// Argon2 PHC string. Never copied into an [`AccountView`].
    pub credential: Credential,

    /// Already-converted image data URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Never negative.
    pub wallet_balance: Money,

    /// Library of purchased catalog items.
    #[serde(default)]
    pub owned_item_ids: BTreeSet<String>,

    /// One entry per redemption, so a code may appear several times.
    #[serde(default)]
    pub redeemed_codes: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Checks whether the catalog item is in this account's library.
    #[inline]
    pub fn owns(&self, item_id: &str) -> bool {
        self.owned_item_ids.contains(item_id)
    }

    /// Number of times this account redeemed `code` (already normalized).
    pub fn redemptions_of(&self, code: &str) -> u32 {
        self.redeemed_codes.iter().filter(|c| c.as_str() == code).count() as u32
    }
}

/// The account as seen outside the ledger: no credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub wallet_balance: Money,
    pub owned_item_ids: Vec<String>,
    pub redeemed_codes: Vec<String>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        AccountView {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            avatar_url: account.avatar_url.clone(),
            wallet_balance: account.wallet_balance,
            owned_item_ids: account.owned_item_ids.iter().cloned().collect(),
            redeemed_codes: account.redeemed_codes.clone(),
        }
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A game available in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Always greater than zero.
    pub price: Money,
    /// One of the snapshot's categories.
    pub category: String,
    #[ts(as = "String")]
    pub release_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Incremented once per purchase that includes this item.
    pub total_sales: u64,
}

// =============================================================================
// Discount Code
// =============================================================================

/// A percentage discount redeemable at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub id: String,
    /// Trimmed, upper-case.
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// 1..=100
    pub percentage: u32,
    /// Global cap across all accounts.
    pub max_uses: u32,
    /// Never exceeds `max_uses`.
    pub used_count: u32,
    pub per_account_limit: u32,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    /// All global uses consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }

    /// Strictly past the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Direction of a wallet movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Credits the wallet.
    TopUp,
    /// Debits the wallet.
    Purchase,
}

/// What a purchase bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

/// An entry in the append-only transaction log.
///
/// `amount` is stored unsigned; [`Transaction::signed_amount`] applies the
/// direction implied by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub kind: TransactionKind,
    pub amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TransactionDetails>,
}

impl Transaction {
    /// Effect of this transaction on the wallet balance.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::TopUp => self.amount,
            TransactionKind::Purchase => Money::zero() - self.amount,
        }
    }
}

// =============================================================================
// Purchase Receipt
// =============================================================================

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub transaction: Transaction,
    pub summary: PurchaseSummary,
    /// The account's full library after the purchase.
    pub owned_item_ids: Vec<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn discount(expires_at: Option<DateTime<Utc>>) -> DiscountCode {
        DiscountCode {
            id: "discount_t".to_string(),
            code: "TEST".to_string(),
            description: String::new(),
            percentage: 10,
            max_uses: 1,
            used_count: 0,
            per_account_limit: 1,
            expires_at,
        }
    }

    #[test]
    fn test_discount_expiry_is_strict() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let code = discount(Some(at));
        assert!(!code.is_expired(at));
        assert!(code.is_expired(at + chrono::Duration::seconds(1)));
        assert!(!discount(None).is_expired(at));
    }

    #[test]
    fn test_discount_exhaustion() {
        let mut code = discount(None);
        assert!(!code.is_exhausted());
        code.used_count = 1;
        assert!(code.is_exhausted());
    }

    #[test]
    fn test_transaction_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::TopUp).unwrap(),
            "\"topup\""
        );
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_signed_amount() {
        let tx = Transaction {
            id: "tx_1".to_string(),
            account_id: "usr_1".to_string(),
            kind: TransactionKind::Purchase,
            amount: Money::from_cents(4_500),
            created_at: Utc::now(),
            details: None,
        };
        assert_eq!(tx.signed_amount(), Money::from_cents(-4_500));
    }
}
