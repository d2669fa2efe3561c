//! Wallet top-ups.

use crate::error::LedgerResult;
use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::types::{AccountView, Transaction, TransactionKind};
use crate::validation::{checked_total, validate_top_up_amount};

use super::{Mutation, MutationContext};

/// Credits an account's wallet.
///
/// ## Order of Checks
/// ```text
/// amount ≤ 0        → InvalidInput  (before any lookup)
/// account missing   → NotFound
/// balance overflows → InvalidInput
/// otherwise         → balance += amount, append top-up transaction
/// ```
#[derive(Debug, Clone)]
pub struct TopUpWallet {
    pub account_id: String,
    pub amount: Money,
}

impl Mutation for TopUpWallet {
    type Output = AccountView;

    fn apply(self, draft: &mut Snapshot, ctx: &MutationContext) -> LedgerResult<AccountView> {
        validate_top_up_amount(self.amount)?;

        let account = draft.require_account_mut(&self.account_id)?;
        account.wallet_balance =
            checked_total("walletBalance", account.wallet_balance, self.amount)?;
        let view = AccountView::from(&*account);

        draft.transactions.push(Transaction {
            id: ctx.new_id("tx"),
            account_id: self.account_id,
            kind: TransactionKind::TopUp,
            amount: self.amount,
            created_at: ctx.now,
            details: None,
        });

        Ok(view)
    }
}
