//! # Error Types
//!
//! Domain-specific error types for gamestore-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  gamestore-core errors (this file)                                     │
//! │  ├── LedgerError      - Every rejection a ledger operation can return  │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── InvariantViolation - A snapshot that breaks a ledger invariant    │
//! │                                                                         │
//! │  gamestore-ledger errors (separate crate)                              │
//! │  └── StorageError     - Key-value store failures                       │
//! │                         (surfaced as LedgerError::PersistenceFailure)  │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError → ErrorCode → UI                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, codes, amounts)
//! 3. Every variant maps to exactly one machine-readable [`ErrorCode`]

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors returned by ledger operations.
///
/// A failed operation never leaves partial effects behind: the published
/// snapshot is exactly what it was before the operation was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Referenced account, catalog item, or discount code is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness violation on username, email, or discount code.
    #[error("{field} '{value}' already exists")]
    Conflict { field: &'static str, value: String },

    /// Request field failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Bad credentials, or an operation that needs a signed-in account.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Discount code has been used `max_uses` times.
    #[error("Discount code {code} has reached maximum usage")]
    Exhausted { code: String },

    /// Discount code is past its expiry.
    #[error("Discount code {code} expired")]
    Expired { code: String },

    /// This account already redeemed the code `limit` times.
    ///
    /// ## User Workflow
    /// ```text
    /// Apply WELCOME10 (per-account limit: 1)
    ///      │
    ///      ▼
    /// account.redeemed_codes contains WELCOME10 once
    ///      │
    ///      ▼
    /// LimitReached { code: "WELCOME10", limit: 1 }
    ///      │
    ///      ▼
    /// UI shows: "You have already used this discount code the maximum times"
    /// ```
    #[error("Discount code {code} already used the maximum of {limit} times by this account")]
    LimitReached { code: String, limit: u32 },

    /// A selected catalog item is already in the account's library.
    #[error("Item already owned: {item_id}")]
    AlreadyOwned { item_id: String },

    /// Purchase requested with no items.
    #[error("No items selected")]
    EmptySelection,

    /// Wallet cannot cover the discounted total.
    #[error("Insufficient wallet balance: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },

    /// The new snapshot could not be written; in-memory state did not advance.
    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    /// Password hashing failed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// A mutation produced a snapshot that breaks a ledger invariant.
    #[error("Rejected commit: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    /// The ledger writer task is no longer running.
    #[error("Ledger writer is not running")]
    WriterClosed,
}

impl LedgerError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(field: &'static str, value: impl Into<String>) -> Self {
        LedgerError::Conflict {
            field,
            value: value.into(),
        }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::Conflict { .. } => ErrorCode::Conflict,
            LedgerError::InvalidInput(_) => ErrorCode::InvalidInput,
            LedgerError::Unauthorized(_) => ErrorCode::Unauthorized,
            LedgerError::Exhausted { .. } => ErrorCode::Exhausted,
            LedgerError::Expired { .. } => ErrorCode::Expired,
            LedgerError::LimitReached { .. } => ErrorCode::LimitReached,
            LedgerError::AlreadyOwned { .. } => ErrorCode::AlreadyOwned,
            LedgerError::EmptySelection => ErrorCode::EmptySelection,
            LedgerError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            LedgerError::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
            LedgerError::Credential(_)
            | LedgerError::InvariantViolation(_)
            | LedgerError::WriterClosed => ErrorCode::Internal,
        }
    }
}

/// Error codes for UI handling.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'INSUFFICIENT_FUNDS':
///     router.navigate(['/wallet']);
///     break;
///   case 'LIMIT_REACHED':
///     showNotification(e.message);
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    InvalidInput,
    Unauthorized,
    Exhausted,
    Expired,
    LimitReached,
    AlreadyOwned,
    EmptySelection,
    InsufficientFunds,
    PersistenceFailure,
    Internal,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Rejected request input, always naming the offending field.
///
/// These errors occur when a request field doesn't meet requirements.
/// Checked before any snapshot lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank username, email, password, title, or code.
    #[error("{field} is required")]
    Required { field: String },

    /// Longer than `MAX_NAME_LENGTH`.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Percentage outside 1-100, or a limit below recorded usage.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Zero or negative price, top-up, or usage cap.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Invalid format (e.g., email without '@').
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Category outside the ledger's category set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Invariant Violation
// =============================================================================

/// A snapshot that breaks one of the ledger invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ledger invariant violated: {0}")]
pub struct InvariantViolation(pub String);

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
