//! # Commerce Operations
//!
//! Every state-changing operation is a request struct implementing
//! [`Mutation`]. Read-only operations are plain functions over `&Snapshot`.
//!
//! ## Commit Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Mutation::apply(self, draft, ctx)                                      │
//! │                                                                         │
//! │  draft  private clone of the consistent base snapshot                  │
//! │  ctx    commit instant + id generator                                  │
//! │                                                                         │
//! │  1. Validate every precondition (reads only)                           │
//! │  2. Only then write to the draft                                       │
//! │  3. Ok(output)  → store encodes, saves, publishes the draft            │
//! │     Err(e)      → draft is dropped, published snapshot unchanged       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutators are synchronous and never await, so a commit observes no other
//! commit's intermediate state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::snapshot::Snapshot;

pub mod account;
pub mod catalog;
pub mod discount;
pub mod purchase;
pub mod wallet;

pub use account::{authenticate, RegisterAccount, UpdateProfile};
pub use catalog::{
    search_catalog, top_sellers, CreateCatalogItem, DeleteCatalogItem, UpdateCatalogItem,
};
pub use discount::{validate_discount, CreateDiscount, DeleteDiscount, UpdateDiscount};
pub use purchase::{quote, Purchase};
pub use wallet::TopUpWallet;

// =============================================================================
// Mutation Context
// =============================================================================

/// Per-commit facts supplied by the ledger store.
#[derive(Debug, Clone, Copy)]
pub struct MutationContext {
    /// Instant of the commit, read once from the injected clock.
    pub now: DateTime<Utc>,
}

impl MutationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        MutationContext { now }
    }

    /// Generates a fresh id such as `tx_3f2a...`.
    pub fn new_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, Uuid::new_v4().simple())
    }
}

// =============================================================================
// Mutation Trait
// =============================================================================

/// A typed read-modify-write request against the ledger.
pub trait Mutation: Send + 'static {
    type Output: Send + 'static;

    /// Applies the request to `draft`.
    ///
    /// On `Err` the draft may be partially written; the store discards it.
    fn apply(self, draft: &mut Snapshot, ctx: &MutationContext) -> LedgerResult<Self::Output>;
}

/// Snapshot replacement, used by `reset_all`.
#[derive(Debug, Clone)]
pub struct ReplaceSnapshot(pub Snapshot);

impl Mutation for ReplaceSnapshot {
    type Output = ();

    fn apply(self, draft: &mut Snapshot, _ctx: &MutationContext) -> LedgerResult<()> {
        *draft = self.0;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::TimeZone;

    use super::*;
    use crate::error::LedgerError;
    use crate::seed;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn seeded() -> Snapshot {
        seed::default_snapshot(now()).unwrap()
    }

    pub fn ctx() -> MutationContext {
        MutationContext::new(now())
    }

    /// Applies on a clone and checks invariants, as the store does.
    pub fn commit<M: Mutation>(base: &Snapshot, mutation: M) -> Result<(Snapshot, M::Output), LedgerError> {
        let mut draft = base.clone();
        let output = mutation.apply(&mut draft, &ctx())?;
        draft.check_invariants()?;
        Ok((draft, output))
    }
}
