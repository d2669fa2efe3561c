//! # Validation Module
//!
//! Input validation and normalization for ledger requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront forms (external)                                  │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Request structs (this module)                                │
//! │  ├── Shape rules: required, length, range                              │
//! │  └── Normalization: trim, lower-case email, upper-case codes           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Mutation against the base snapshot                           │
//! │  ├── Uniqueness (Conflict)                                             │
//! │  ├── Existence (NotFound)                                              │
//! │  └── Snapshot::check_invariants before publish                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Normalizing validators return the cleaned value so callers store exactly
//! what was checked.

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn bounded_text(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(required(field));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Account Fields
// =============================================================================

/// Trims a username.
///
/// ## Example
/// ```rust
/// use gamestore_core::validation::normalize_username;
///
/// assert_eq!(normalize_username("  demo ").unwrap(), "demo");
/// assert!(normalize_username("   ").is_err());
/// ```
pub fn normalize_username(username: &str) -> ValidationResult<String> {
    bounded_text("username", username)
}

/// Trims and lower-cases an email address.
///
/// ## Rules
/// - Must not be empty
/// - Must have text on both sides of a single '@'
pub fn normalize_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(required("email"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain".to_string(),
        }),
    }
}

/// Passwords are taken verbatim; only emptiness is rejected.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(required("password"));
    }
    Ok(())
}

/// Trims an optional data URL; blank means "none".
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Money
// =============================================================================

fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if amount > Money::MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: Money::MAX_AMOUNT.cents(),
        });
    }
    Ok(())
}

/// `a + b`, rejected as out of range instead of overflowing.
pub fn checked_total(field: &str, a: Money, b: Money) -> ValidationResult<Money> {
    a.checked_add(b).ok_or_else(|| ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

/// Validates a wallet top-up amount: 0.01 up to `Money::MAX_AMOUNT`.
pub fn validate_top_up_amount(amount: Money) -> ValidationResult<()> {
    validate_amount("amount", amount)
}

/// Validates a catalog price.
///
/// ## Rules
/// - Must be greater than zero (the catalog has no free titles)
/// - At most `Money::MAX_AMOUNT`
pub fn validate_price(price: Money) -> ValidationResult<()> {
    validate_amount("price", price)
}

// =============================================================================
// Catalog Fields
// =============================================================================

pub fn normalize_title(title: &str) -> ValidationResult<String> {
    bounded_text("title", title)
}

/// Resolves `category` against the configured set, ignoring case.
///
/// Returns the canonical spelling from `categories`.
///
/// ## Example
/// ```rust
/// use gamestore_core::validation::resolve_category;
///
/// let categories = vec!["Action".to_string(), "RPG".to_string()];
/// assert_eq!(resolve_category("rpg", &categories).unwrap(), "RPG");
/// assert!(resolve_category("Racing", &categories).is_err());
/// ```
pub fn resolve_category(category: &str, categories: &[String]) -> ValidationResult<String> {
    let category = category.trim();

    if category.is_empty() {
        return Err(required("category"));
    }

    categories
        .iter()
        .find(|c| c.eq_ignore_ascii_case(category))
        .cloned()
        .ok_or_else(|| ValidationError::NotAllowed {
            field: "category".to_string(),
            allowed: categories.to_vec(),
        })
}

// =============================================================================
// Discount Fields
// =============================================================================

/// Canonical form of a discount code: trimmed, upper-case.
///
/// Used for lookups, where a blank code is simply "no match".
pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Canonical form of a discount code for storage; blank is rejected.
pub fn normalize_discount_code(code: &str) -> ValidationResult<String> {
    let code = canonical_code(code);

    if code.is_empty() {
        return Err(required("code"));
    }

    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(code)
}

/// Validates a discount percentage.
///
/// ## Rules
/// - 1 to 100 inclusive
pub fn validate_percentage(percentage: u32) -> ValidationResult<()> {
    if !(1..=100).contains(&percentage) {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 1,
            max: 100,
        });
    }
    Ok(())
}

/// Validates a usage cap (`maxUses`, `perAccountLimit`).
pub fn validate_use_limit(field: &str, limit: u32) -> ValidationResult<()> {
    if limit == 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username() {
        assert_eq!(normalize_username(" Alice ").unwrap(), "Alice");
        assert!(matches!(
            normalize_username(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            normalize_username(&"x".repeat(MAX_NAME_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_email() {
        assert_eq!(
            normalize_email(" Demo@GameStore.dev ").unwrap(),
            "demo@gamestore.dev"
        );
        assert!(matches!(
            normalize_email("  "),
            Err(ValidationError::Required { .. })
        ));
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@domain").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn test_password_is_not_trimmed() {
        assert!(validate_password(" ").is_ok());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_amounts() {
        assert!(validate_top_up_amount(Money::from_cents(1)).is_ok());
        assert!(validate_top_up_amount(Money::zero()).is_err());
        assert!(validate_top_up_amount(Money::from_cents(-100)).is_err());
        assert!(validate_price(Money::zero()).is_err());

        assert!(validate_top_up_amount(Money::MAX_AMOUNT).is_ok());
        assert!(matches!(
            validate_top_up_amount(Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_price(Money::MAX_AMOUNT + Money::from_cents(1)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_discount_fields() {
        assert_eq!(normalize_discount_code(" welcome10 ").unwrap(), "WELCOME10");
        assert!(normalize_discount_code("   ").is_err());
        assert!(normalize_discount_code("TWO WORDS").is_err());
        assert_eq!(canonical_code("  "), "");

        assert!(validate_percentage(1).is_ok());
        assert!(validate_percentage(100).is_ok());
        assert!(validate_percentage(0).is_err());
        assert!(validate_percentage(101).is_err());

        assert!(validate_use_limit("maxUses", 0).is_err());
        assert!(validate_use_limit("maxUses", 1).is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(normalize_optional_text(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional_text(Some(" data:image/png;base64,AAA ".to_string())),
            Some("data:image/png;base64,AAA".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }
}
