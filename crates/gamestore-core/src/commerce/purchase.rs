//! # Purchase
//!
//! The checkout transaction: debit the wallet, grant ownership, consume the
//! discount, count the sales, log the transaction. All or nothing.
//!
//! ## Order of Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  item_ids empty ─────────────────────────────► EmptySelection          │
//! │  account missing ────────────────────────────► NotFound                │
//! │  for each id (deduplicated, first-seen order):                         │
//! │      not in catalog ─────────────────────────► NotFound                │
//! │      already owned ──────────────────────────► AlreadyOwned            │
//! │  discount code given and not blank:                                    │
//! │      not eligible ──────────────► NotFound / Exhausted / Expired /     │
//! │                                   LimitReached                         │
//! │  total_after_discount > balance ─────────────► InsufficientFunds       │
//! │                                                                         │
//! │  ── nothing written above this line ──                                 │
//! │                                                                         │
//! │  balance −= total_after_discount                                       │
//! │  owned_item_ids ∪= items          item.total_sales += 1                │
//! │  discount.used_count += 1         redeemed_codes.push(code)            │
//! │  transactions.push(purchase)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::pricing::PurchaseSummary;
use crate::snapshot::Snapshot;
use crate::types::{PurchaseReceipt, Transaction, TransactionDetails, TransactionKind};
use crate::validation::{canonical_code, checked_total};

use super::discount::eligible_discount_index;
use super::{Mutation, MutationContext};

#[derive(Debug, Clone)]
pub struct Purchase {
    pub account_id: String,
    pub item_ids: Vec<String>,
    pub discount_code: Option<String>,
}

/// Drops repeated ids, keeping the first occurrence of each.
fn dedup_in_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

impl Mutation for Purchase {
    type Output = PurchaseReceipt;

    fn apply(self, draft: &mut Snapshot, ctx: &MutationContext) -> LedgerResult<PurchaseReceipt> {
        if self.item_ids.is_empty() {
            return Err(LedgerError::EmptySelection);
        }

        let account = draft.require_account(&self.account_id)?;
        let item_ids = dedup_in_order(self.item_ids);

        let mut total = Money::zero();
        for id in &item_ids {
            let item = draft
                .item(id)
                .ok_or_else(|| LedgerError::not_found("Catalog item", id.clone()))?;
            if account.owns(id) {
                return Err(LedgerError::AlreadyOwned {
                    item_id: id.clone(),
                });
            }
            total = checked_total("total", total, item.price)?;
        }

        let code = self
            .discount_code
            .as_deref()
            .map(canonical_code)
            .filter(|c| !c.is_empty());

        let discount_index = code
            .as_deref()
            .map(|c| eligible_discount_index(draft, &self.account_id, c, ctx.now))
            .transpose()?;
        let percentage = discount_index
            .map(|i| draft.discount_codes[i].percentage)
            .unwrap_or(0);

        let summary = PurchaseSummary::compute(total, percentage);
        let balance = account.wallet_balance;
        let remaining = balance
            .checked_debit(summary.total_after_discount)
            .ok_or(LedgerError::InsufficientFunds {
                required: summary.total_after_discount,
                available: balance,
            })?;

        // Preconditions hold; write the draft.
        if let Some(i) = discount_index {
            draft.discount_codes[i].used_count += 1;
        }
        for item in draft
            .catalog_items
            .iter_mut()
            .filter(|item| item_ids.contains(&item.id))
        {
            item.total_sales += 1;
        }

        let account = draft.require_account_mut(&self.account_id)?;
        account.wallet_balance = remaining;
        account.owned_item_ids.extend(item_ids.iter().cloned());
        if let Some(code) = &code {
            account.redeemed_codes.push(code.clone());
        }
        let owned_item_ids = account.owned_item_ids.iter().cloned().collect();

        let transaction = Transaction {
            id: ctx.new_id("tx"),
            account_id: self.account_id,
            kind: TransactionKind::Purchase,
            amount: summary.total_after_discount,
            created_at: ctx.now,
            details: Some(TransactionDetails {
                item_ids,
                discount_code: code,
            }),
        };
        draft.transactions.push(transaction.clone());

        Ok(PurchaseReceipt {
            transaction,
            summary,
            owned_item_ids,
        })
    }
}

/// Prices a selection against the live snapshot without checking eligibility.
///
/// Ids missing from the catalog are skipped. The discount percentage comes
/// from `discount_code` if it still exists.
pub fn quote(snapshot: &Snapshot, item_ids: &[String], discount_code: Option<&str>) -> PurchaseSummary {
    let prices = item_ids
        .iter()
        .filter_map(|id| snapshot.item(id))
        .map(|item| item.price);
    let percentage = discount_code
        .and_then(|code| snapshot.discount_by_code(code))
        .map(|d| d.percentage)
        .unwrap_or(0);

    PurchaseSummary::from_prices(prices, percentage)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::catalog::CreateCatalogItem;
    use crate::commerce::test_support::{commit, seeded};
    use crate::commerce::{RegisterAccount, TopUpWallet};
    use crate::seed::{ADMIN_ACCOUNT_ID, DEMO_ACCOUNT_ID};
    use crate::types::AccountView;

    fn purchase(account_id: &str, ids: &[&str], code: Option<&str>) -> Purchase {
        Purchase {
            account_id: account_id.to_string(),
            item_ids: ids.iter().map(|s| s.to_string()).collect(),
            discount_code: code.map(str::to_string),
        }
    }

    /// A fresh account funded with `balance`.
    fn funded(base: &Snapshot, username: &str, balance: Money) -> (Snapshot, AccountView) {
        let register =
            RegisterAccount::new(username, &format!("{}@x.dev", username), "pw", None).unwrap();
        let (snapshot, view) = commit(base, register).unwrap();
        let (snapshot, view) = commit(
            &snapshot,
            TopUpWallet {
                account_id: view.id,
                amount: balance,
            },
        )
        .unwrap();
        (snapshot, view)
    }

    fn add_item(base: &Snapshot, title: &str, price: Money) -> (Snapshot, String) {
        let (snapshot, item) = commit(
            base,
            CreateCatalogItem {
                title: title.to_string(),
                description: String::new(),
                price,
                category: "Indie".to_string(),
                cover_image: None,
            },
        )
        .unwrap();
        (snapshot, item.id)
    }

    #[test]
    fn test_insufficient_funds_leaves_balance() {
        let (snapshot, buyer) = funded(&seeded(), "poor", Money::from_major_minor(100, 0));
        let (snapshot, item) = add_item(&snapshot, "Pricey", Money::from_major_minor(150, 0));

        let err = commit(&snapshot, purchase(&buyer.id, &[&item], None)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: Money::from_major_minor(150, 0),
                available: Money::from_major_minor(100, 0),
            }
        );
        assert_eq!(
            snapshot.account(&buyer.id).unwrap().wallet_balance,
            Money::from_major_minor(100, 0)
        );
    }

    #[test]
    fn test_two_items_with_ten_percent() {
        let (snapshot, buyer) = funded(&seeded(), "buyer", Money::from_major_minor(2000, 0));
        let (snapshot, a) = add_item(&snapshot, "Six", Money::from_major_minor(600, 0));
        let (snapshot, b) = add_item(&snapshot, "Four", Money::from_major_minor(400, 0));

        let (next, receipt) =
            commit(&snapshot, purchase(&buyer.id, &[&a, &b], Some("welcome10"))).unwrap();

        assert_eq!(receipt.summary.total_before_discount, Money::from_major_minor(1000, 0));
        assert_eq!(receipt.summary.discount_amount, Money::from_major_minor(100, 0));
        assert_eq!(receipt.summary.total_after_discount, Money::from_major_minor(900, 0));
        assert_eq!(receipt.transaction.amount, Money::from_major_minor(900, 0));
        assert_eq!(
            receipt.transaction.details.as_ref().unwrap().discount_code.as_deref(),
            Some("WELCOME10")
        );

        let account = next.account(&buyer.id).unwrap();
        assert_eq!(account.wallet_balance, Money::from_major_minor(1100, 0));
        assert!(account.owns(&a) && account.owns(&b));
        assert_eq!(account.redemptions_of("WELCOME10"), 1);
        assert_eq!(next.discount_by_code("WELCOME10").unwrap().used_count, 2);
        assert_eq!(next.item(&a).unwrap().total_sales, 1);
    }

    #[test]
    fn test_already_owned_writes_nothing() {
        let base = seeded();
        let err = commit(&base, purchase(DEMO_ACCOUNT_ID, &["game_bal", "game_stardew"], None))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyOwned {
                item_id: "game_stardew".to_string()
            }
        );
    }

    #[test]
    fn test_duplicates_are_charged_once() {
        let (next, receipt) = commit(
            &seeded(),
            purchase(ADMIN_ACCOUNT_ID, &["game_bal", "game_bal", "game_cities"], None),
        )
        .unwrap();

        assert_eq!(
            receipt.transaction.details.unwrap().item_ids,
            vec!["game_bal".to_string(), "game_cities".to_string()]
        );
        assert_eq!(receipt.summary.total_before_discount, Money::from_cents(189_900 + 65_000));
        assert_eq!(next.item("game_bal").unwrap().total_sales, 11);
    }

    #[test]
    fn test_blank_code_means_no_discount() {
        let (next, receipt) =
            commit(&seeded(), purchase(ADMIN_ACCOUNT_ID, &["game_bal"], Some("   "))).unwrap();
        assert_eq!(receipt.summary.discount_percentage, 0);
        assert!(receipt.transaction.details.unwrap().discount_code.is_none());
        assert!(next.account(ADMIN_ACCOUNT_ID).unwrap().redeemed_codes.is_empty());
    }

    #[test]
    fn test_check_order() {
        let base = seeded();

        assert_eq!(
            commit(&base, purchase("usr_missing", &[], None)).unwrap_err(),
            LedgerError::EmptySelection
        );
        assert!(matches!(
            commit(&base, purchase("usr_missing", &["game_bal"], None)).unwrap_err(),
            LedgerError::NotFound { entity: "Account", .. }
        ));
        assert!(matches!(
            commit(&base, purchase(DEMO_ACCOUNT_ID, &["game_nope", "game_stardew"], None))
                .unwrap_err(),
            LedgerError::NotFound { entity: "Catalog item", .. }
        ));
        // Ownership is checked before the discount.
        assert!(matches!(
            commit(&base, purchase(DEMO_ACCOUNT_ID, &["game_stardew"], Some("WELCOME10")))
                .unwrap_err(),
            LedgerError::AlreadyOwned { .. }
        ));
        assert!(matches!(
            commit(&base, purchase(DEMO_ACCOUNT_ID, &["game_bal"], Some("WELCOME10"))).unwrap_err(),
            LedgerError::LimitReached { .. }
        ));
    }

    #[test]
    fn test_exact_balance_is_enough() {
        let (snapshot, buyer) = funded(&seeded(), "exact", Money::from_cents(45_000));
        let (next, _) = commit(&snapshot, purchase(&buyer.id, &["game_stardew"], None)).unwrap();
        assert!(next.account(&buyer.id).unwrap().wallet_balance.is_zero());
    }

    #[test]
    fn test_quote_skips_missing_items() {
        let snapshot = seeded();
        let ids = vec!["game_stardew".to_string(), "game_gone".to_string()];
        let summary = quote(&snapshot, &ids, Some("bigspender"));
        assert_eq!(summary.total_before_discount, Money::from_cents(45_000));
        assert_eq!(summary.discount_percentage, 15);
        assert_eq!(quote(&snapshot, &ids, Some("NOPE")).discount_percentage, 0);
    }
}
