//! Argon2id hashing of refresh-token secrets.
//!
//! Only the PHC string is stored, so a database leak does not expose
//! redeemable refresh tokens. The cost parameters are the library defaults
//! and are not configurable at runtime.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use keyturn_core::error::CoreError;

#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHasher;

impl CredentialHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a raw secret with a fresh random salt.
    ///
    /// Returns the PHC-formatted hash string (algorithm, params, salt, hash).
    pub fn hash(&self, secret: &[u8]) -> Result<String, CoreError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret, &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CoreError::Internal(format!("refresh secret hashing failed: {e}")))
    }

    /// Check a presented secret against a stored PHC hash.
    ///
    /// A malformed stored hash is a mismatch, not an error.
    pub fn verify(&self, hash: &str, secret: &[u8]) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default().verify_password(secret, &parsed).is_ok()
    }
}
