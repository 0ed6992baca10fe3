//! Credential digests

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// One-way digest used to store and check passwords
pub trait PasswordHasher: Send + Sync + std::fmt::Debug {
    /// Digest a password for storage
    fn hash(&self, password: &str) -> String;

    /// Check a password against a stored digest
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// Lowercase hex SHA-256 of the UTF-8 password
///
/// Matches the digest format of existing user tables. It is unsalted, so prefer a
/// memory-hard hasher behind [`PasswordHasher`] for new deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let computed = self.hash(password);
        let stored = stored_hash.trim().to_ascii_lowercase();
        computed.as_bytes().ct_eq(stored.as_bytes()).into()
    }
}
