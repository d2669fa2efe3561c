//! # Account Operations
//!
//! Registration, sign-in and profile edits.
//!
//! ## User Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register                                                               │
//! │                                                                         │
//! │  RegisterAccount::new(username, email, password, avatar)               │
//! │       │  trim / lower-case / hash (argon2, off the writer task)        │
//! │       ▼                                                                 │
//! │  ledger.apply(request)                                                 │
//! │       │  username or email taken (ignoring case)? → Conflict           │
//! │       ▼                                                                 │
//! │  Account { role: user, balance: 0, library: ∅ }                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use crate::credential::Credential;
use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::types::{Account, AccountView, Role};
use crate::validation::{
    normalize_email, normalize_optional_text, normalize_username, validate_password,
};

use super::{Mutation, MutationContext};

// =============================================================================
// Register
// =============================================================================

/// A validated registration request.
///
/// Building the request hashes the password, so the hash cost is paid by
/// the caller rather than the ledger writer.
#[derive(Debug, Clone)]
pub struct RegisterAccount {
    username: String,
    email: String,
    credential: Credential,
    avatar_url: Option<String>,
}

impl RegisterAccount {
    pub fn new(
        username: &str,
        email: &str,
        password: &str,
        avatar_url: Option<String>,
    ) -> LedgerResult<Self> {
        let username = normalize_username(username)?;
        let email = normalize_email(email)?;
        validate_password(password)?;

        Ok(RegisterAccount {
            username,
            email,
            credential: Credential::hash(password)?,
            avatar_url: normalize_optional_text(avatar_url),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Mutation for RegisterAccount {
    type Output = AccountView;

    fn apply(self, draft: &mut Snapshot, ctx: &MutationContext) -> LedgerResult<AccountView> {
        if draft.account_by_username(&self.username).is_some() {
            return Err(LedgerError::conflict("Username", self.username));
        }
        if draft.account_by_email(&self.email).is_some() {
            return Err(LedgerError::conflict("Email", self.email));
        }

        let account = Account {
            id: ctx.new_id("usr"),
            username: self.username,
            email: self.email,
            role: Role::User,
            credential: self.credential,
            avatar_url: self.avatar_url,
            wallet_balance: Money::zero(),
            owned_item_ids: BTreeSet::new(),
            redeemed_codes: Vec::new(),
            created_at: ctx.now,
        };
        let view = AccountView::from(&account);
        draft.accounts.push(account);

        Ok(view)
    }
}

// =============================================================================
// Authenticate
// =============================================================================

/// Checks a username/password pair against the snapshot.
///
/// Unknown user and wrong password produce the same error.
pub fn authenticate(snapshot: &Snapshot, username: &str, password: &str) -> LedgerResult<AccountView> {
    snapshot
        .account_by_username(username)
        .filter(|account| account.credential.verify(password))
        .map(AccountView::from)
        .ok_or_else(|| LedgerError::Unauthorized("Invalid username or password".to_string()))
}

// =============================================================================
// Update Profile
// =============================================================================

/// Partial profile edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub account_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` removes the avatar.
    pub avatar_url: Option<Option<String>>,
}

impl Mutation for UpdateProfile {
    type Output = AccountView;

    fn apply(self, draft: &mut Snapshot, _ctx: &MutationContext) -> LedgerResult<AccountView> {
        draft.require_account(&self.account_id)?;

        let username = self.username.as_deref().map(normalize_username).transpose()?;
        let email = self.email.as_deref().map(normalize_email).transpose()?;

        if let Some(username) = &username {
            if let Some(other) = draft.account_by_username(username) {
                if other.id != self.account_id {
                    return Err(LedgerError::conflict("Username", username.clone()));
                }
            }
        }
        if let Some(email) = &email {
            if let Some(other) = draft.account_by_email(email) {
                if other.id != self.account_id {
                    return Err(LedgerError::conflict("Email", email.clone()));
                }
            }
        }

        let account = draft.require_account_mut(&self.account_id)?;
        if let Some(username) = username {
            account.username = username;
        }
        if let Some(email) = email {
            account.email = email;
        }
        if let Some(avatar_url) = self.avatar_url {
            account.avatar_url = normalize_optional_text(avatar_url);
        }

        Ok(AccountView::from(&*account))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::test_support::{commit, seeded};
    use crate::seed::DEMO_ACCOUNT_ID;

    fn register(username: &str, email: &str) -> RegisterAccount {
        RegisterAccount::new(username, email, "secret", None).unwrap()
    }

    #[test]
    fn test_register_normalizes_and_starts_empty() {
        let (next, view) = commit(&seeded(), register("  Alice ", "Alice@Example.COM")).unwrap();

        assert_eq!(view.username, "Alice");
        assert_eq!(view.email, "alice@example.com");
        assert_eq!(view.role, Role::User);
        assert!(view.wallet_balance.is_zero());
        assert!(view.owned_item_ids.is_empty());
        assert!(view.id.starts_with("usr_"));

        let stored = next.account(&view.id).unwrap();
        assert!(stored.credential.verify("secret"));
    }

    #[test]
    fn test_register_rejects_blank_fields() {
        assert!(matches!(
            RegisterAccount::new("", "a@b.c", "pw", None),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            RegisterAccount::new("bob", " ", "pw", None),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            RegisterAccount::new("bob", "bob@x.dev", "", None),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_register_conflicts_ignore_case() {
        let err = commit(&seeded(), register("DEMO", "new@x.dev")).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { field: "Username", .. }));

        let err = commit(&seeded(), register("newbie", "DEMO@gamestore.dev")).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { field: "Email", .. }));
    }

    #[test]
    fn test_authenticate() {
        let snapshot = seeded();
        let view = authenticate(&snapshot, "Demo", "demo123").unwrap();
        assert_eq!(view.id, DEMO_ACCOUNT_ID);

        assert!(matches!(
            authenticate(&snapshot, "demo", "wrong"),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&snapshot, "ghost", "demo123"),
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_update_profile_partial() {
        let (_, view) = commit(
            &seeded(),
            UpdateProfile {
                account_id: DEMO_ACCOUNT_ID.to_string(),
                email: Some("Player@GameStore.dev".to_string()),
                avatar_url: Some(Some("data:image/png;base64,AAA".to_string())),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(view.username, "demo");
        assert_eq!(view.email, "player@gamestore.dev");
        assert_eq!(view.avatar_url.as_deref(), Some("data:image/png;base64,AAA"));
    }

    #[test]
    fn test_update_profile_clears_avatar() {
        let (with_avatar, _) = commit(
            &seeded(),
            UpdateProfile {
                account_id: DEMO_ACCOUNT_ID.to_string(),
                avatar_url: Some(Some("data:x".to_string())),
                ..Default::default()
            },
        )
        .unwrap();

        let (_, view) = commit(
            &with_avatar,
            UpdateProfile {
                account_id: DEMO_ACCOUNT_ID.to_string(),
                avatar_url: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(view.avatar_url, None);
    }

    #[test]
    fn test_update_profile_rejections() {
        let err = commit(
            &seeded(),
            UpdateProfile {
                account_id: DEMO_ACCOUNT_ID.to_string(),
                username: Some("ADMIN".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));

        // Renaming to your own name in another case is not a conflict.
        assert!(commit(
            &seeded(),
            UpdateProfile {
                account_id: DEMO_ACCOUNT_ID.to_string(),
                username: Some("Demo".to_string()),
                ..Default::default()
            },
        )
        .is_ok());

        let err = commit(
            &seeded(),
            UpdateProfile {
                account_id: DEMO_ACCOUNT_ID.to_string(),
                username: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = commit(
            &seeded(),
            UpdateProfile {
                account_id: "usr_missing".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
