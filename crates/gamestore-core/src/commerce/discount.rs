//! # Discount Codes
//!
//! Eligibility checks and administrative CRUD.
//!
//! ## Eligibility
//! ```text
//! code (trimmed, upper-cased)
//!   │
//!   ├── no such code ───────────────► NotFound
//!   ├── used_count ≥ max_uses ──────► Exhausted
//!   ├── expires_at < now ───────────► Expired
//!   ├── no such account ────────────► NotFound
//!   ├── redemptions ≥ limit ────────► LimitReached
//!   └── eligible
//! ```
//!
//! Redemption history is keyed by code text, so it follows a code across a
//! delete and re-create with the same text.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::snapshot::Snapshot;
use crate::types::DiscountCode;
use crate::validation::{
    canonical_code, normalize_discount_code, validate_percentage, validate_use_limit,
};

use super::{Mutation, MutationContext};

// =============================================================================
// Eligibility
// =============================================================================

/// Position of `code` in `snapshot.discount_codes` if `account_id` may redeem
/// it at `now`.
pub(crate) fn eligible_discount_index(
    snapshot: &Snapshot,
    account_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> LedgerResult<usize> {
    let code = canonical_code(code);

    let index = snapshot
        .discount_codes
        .iter()
        .position(|d| d.code == code)
        .ok_or_else(|| LedgerError::not_found("Discount code", code.clone()))?;
    let discount = &snapshot.discount_codes[index];

    if discount.is_exhausted() {
        return Err(LedgerError::Exhausted { code });
    }
    if discount.is_expired(now) {
        return Err(LedgerError::Expired { code });
    }

    let account = snapshot.require_account(account_id)?;
    if account.redemptions_of(&discount.code) >= discount.per_account_limit {
        return Err(LedgerError::LimitReached {
            code,
            limit: discount.per_account_limit,
        });
    }

    Ok(index)
}

/// Checks whether `account_id` may redeem `code` at `now`.
///
/// Pure: no counters move until a purchase consumes the code.
pub fn validate_discount(
    snapshot: &Snapshot,
    account_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> LedgerResult<DiscountCode> {
    let index = eligible_discount_index(snapshot, account_id, code, now)?;
    Ok(snapshot.discount_codes[index].clone())
}

/// Highest number of times any single account redeemed `code`.
fn max_redemptions(snapshot: &Snapshot, code: &str) -> u32 {
    snapshot
        .accounts
        .iter()
        .map(|a| a.redemptions_of(code))
        .max()
        .unwrap_or(0)
}

fn check_limit_covers_history(snapshot: &Snapshot, code: &str, limit: u32) -> LedgerResult<()> {
    let redeemed = max_redemptions(snapshot, code);
    if limit < redeemed {
        return Err(ValidationError::OutOfRange {
            field: "perAccountLimit".to_string(),
            min: redeemed as i64,
            max: u32::MAX as i64,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Clone)]
pub struct CreateDiscount {
    pub code: String,
    pub description: String,
    pub percentage: u32,
    pub max_uses: u32,
    pub per_account_limit: u32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Mutation for CreateDiscount {
    type Output = DiscountCode;

    fn apply(self, draft: &mut Snapshot, ctx: &MutationContext) -> LedgerResult<DiscountCode> {
        let code = normalize_discount_code(&self.code)?;
        validate_percentage(self.percentage)?;
        validate_use_limit("maxUses", self.max_uses)?;
        validate_use_limit("perAccountLimit", self.per_account_limit)?;

        if draft.discount_by_code(&code).is_some() {
            return Err(LedgerError::conflict("Discount code", code));
        }
        check_limit_covers_history(draft, &code, self.per_account_limit)?;

        let discount = DiscountCode {
            id: ctx.new_id("discount"),
            code,
            description: self.description.trim().to_string(),
            percentage: self.percentage,
            max_uses: self.max_uses,
            used_count: 0,
            per_account_limit: self.per_account_limit,
            expires_at: self.expires_at,
        };
        draft.discount_codes.push(discount.clone());

        Ok(discount)
    }
}

// =============================================================================
// Update
// =============================================================================

/// Partial discount edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateDiscount {
    pub discount_id: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub percentage: Option<u32>,
    pub max_uses: Option<u32>,
    pub per_account_limit: Option<u32>,
    /// `Some(None)` removes the expiry.
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl Mutation for UpdateDiscount {
    type Output = DiscountCode;

    fn apply(self, draft: &mut Snapshot, _ctx: &MutationContext) -> LedgerResult<DiscountCode> {
        let current = draft
            .discount(&self.discount_id)
            .ok_or_else(|| LedgerError::not_found("Discount code", self.discount_id.clone()))?
            .clone();

        let code = self.code.as_deref().map(normalize_discount_code).transpose()?;
        if let Some(percentage) = self.percentage {
            validate_percentage(percentage)?;
        }
        if let Some(max_uses) = self.max_uses {
            validate_use_limit("maxUses", max_uses)?;
            if max_uses < current.used_count {
                return Err(ValidationError::OutOfRange {
                    field: "maxUses".to_string(),
                    min: current.used_count as i64,
                    max: u32::MAX as i64,
                }
                .into());
            }
        }
        if let Some(limit) = self.per_account_limit {
            validate_use_limit("perAccountLimit", limit)?;
        }

        if let Some(code) = &code {
            if let Some(other) = draft.discount_by_code(code) {
                if other.id != current.id {
                    return Err(LedgerError::conflict("Discount code", code.clone()));
                }
            }
        }

        let final_code = code.clone().unwrap_or_else(|| current.code.clone());
        let final_limit = self.per_account_limit.unwrap_or(current.per_account_limit);
        check_limit_covers_history(draft, &final_code, final_limit)?;

        let discount = draft
            .discount_codes
            .iter_mut()
            .find(|d| d.id == self.discount_id)
            .ok_or_else(|| LedgerError::not_found("Discount code", self.discount_id.clone()))?;

        discount.code = final_code;
        discount.per_account_limit = final_limit;
        if let Some(description) = self.description {
            discount.description = description.trim().to_string();
        }
        if let Some(percentage) = self.percentage {
            discount.percentage = percentage;
        }
        if let Some(max_uses) = self.max_uses {
            discount.max_uses = max_uses;
        }
        if let Some(expires_at) = self.expires_at {
            discount.expires_at = expires_at;
        }

        Ok(discount.clone())
    }
}

// =============================================================================
// Delete
// =============================================================================

#[derive(Debug, Clone)]
pub struct DeleteDiscount {
    pub discount_id: String,
}

impl Mutation for DeleteDiscount {
    type Output = ();

    fn apply(self, draft: &mut Snapshot, _ctx: &MutationContext) -> LedgerResult<()> {
        let before = draft.discount_codes.len();
        draft.discount_codes.retain(|d| d.id != self.discount_id);

        if draft.discount_codes.len() == before {
            return Err(LedgerError::not_found("Discount code", self.discount_id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
