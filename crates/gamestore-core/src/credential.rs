//! # Credentials
//!
//! Account secrets are stored as argon2id PHC strings. The plain secret only
//! exists while a request is being built and is never written to a snapshot.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Memory cost in KiB. Sized for an interactive storefront, not a vault.
const MEMORY_COST_KIB: u32 = 4096;

/// Number of argon2 passes.
const TIME_COST: u32 = 1;

/// A hashed account secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Hashes `secret` with a fresh random salt.
    pub fn hash(secret: &str) -> LedgerResult<Self> {
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, 1, None)
            .map_err(|e| LedgerError::Credential(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);

        let hash = argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| LedgerError::Credential(format!("Failed to hash secret: {}", e)))?;

        Ok(Credential(hash.to_string()))
    }

    /// Checks `secret` against the stored hash.
    ///
    /// The cost parameters are read back from the PHC string, so hashes made
    /// with older parameters keep verifying.
    pub fn verify(&self, secret: &str) -> bool {
        let parsed = match PasswordHash::new(&self.0) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
