// Secret Verifier Port
//
// Manual resets are gated on an owner secret. Hashing and verification are
// delegated to an auth adapter; the engine only compares outcomes.

/// Verifies a caller-supplied secret against a stored hash
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, secret: &str, stored_hash: &str) -> bool;
}

/// Plain-text comparison for tests only
pub struct PlainSecretVerifier;

impl SecretVerifier for PlainSecretVerifier {
    fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        secret == stored_hash
    }
}
