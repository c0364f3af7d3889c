// Waitless Infrastructure - Reset Secret Verification
//
// Stored secrets are Argon2id PHC strings. Verification never surfaces why
// it failed; a malformed stored hash and a wrong secret both come back
// false (logged at warn for the operator).

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use tracing::warn;
use waitless_core::error::{AppError, Result};
use waitless_core::port::SecretVerifier;

/// Argon2id verifier for the shop reset secret
#[derive(Debug, Default)]
pub struct Argon2SecretVerifier;

impl SecretVerifier for Argon2SecretVerifier {
    fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "Stored reset secret hash is not a valid PHC string");
                return false;
            }
        };

        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hash a reset secret for storage (shop provisioning and tests)
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Secret hashing failed: {}", e)))?;
    Ok(hash.to_string())
}
