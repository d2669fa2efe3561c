//! # gamestore-core: Pure Business Logic for the Game Store Ledger
//!
//! This crate is the **heart** of the storefront. It owns the ledger records
//! and every business rule, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Game Store Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront UI (external)                     │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Wallet ──► Admin screens   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            gamestore-ledger (commit queue, storage)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Mutation::apply(draft, ctx)            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ gamestore-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ commerce  │  │ validation│  │   │
//! │  │   │  Account  │  │   Money   │  │ Purchase  │  │   rules   │  │   │
//! │  │   │ Snapshot  │  │  Summary  │  │  TopUp    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO RUNTIME • NO WALL CLOCK • PURE FUNCTIONS          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger records (Account, CatalogItem, DiscountCode, Transaction)
//! - [`snapshot`] - The complete ledger state and its JSON codec
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Purchase summary math
//! - [`commerce`] - Every Commerce Operation as a typed [`Mutation`]
//! - [`validation`] - Input validation
//! - [`credential`] - Password hashing
//! - [`clock`] - Injected time source
//! - [`seed`] - Default ledger contents
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use gamestore_core::money::Money;
//! use gamestore_core::pricing::PurchaseSummary;
//!
//! let total = Money::from_major_minor(1000, 0);
//! let summary = PurchaseSummary::compute(total, 10);
//!
//! assert_eq!(summary.discount_amount, Money::from_major_minor(100, 0));
//! assert_eq!(summary.total_after_discount, Money::from_major_minor(900, 0));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod commerce;
pub mod credential;
pub mod error;
pub mod money;
pub mod pricing;
pub mod seed;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use commerce::{Mutation, MutationContext};
pub use credential::Credential;
pub use error::{ErrorCode, InvariantViolation, LedgerError, LedgerResult, ValidationError};
pub use money::Money;
pub use pricing::PurchaseSummary;
pub use snapshot::Snapshot;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of top sellers returned when the caller does not ask for a limit.
pub const DEFAULT_TOP_SELLERS: usize = 5;

/// Maximum length of usernames and catalog titles.
pub const MAX_NAME_LENGTH: usize = 200;
