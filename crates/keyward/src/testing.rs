//! Test doubles
//!
//! Available under `cfg(test)` and the `test-utils` feature.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::algorithm::SigningAlgorithm;
use crate::custodian::KeyCustodian;
use crate::errors::CustodianError;

/// In-memory custodian that counts calls and can be switched off
///
/// "Signatures" are `SHA-256(secret || input)`. This is not a real signature scheme and
/// exists only so the token layer can be exercised without a key store.
#[derive(Debug)]
pub struct FakeCustodian {
    algorithm: SigningAlgorithm,
    secret: Vec<u8>,
    unavailable: AtomicBool,
    sign_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl FakeCustodian {
    /// Available custodian with a fixed secret
    #[must_use]
    pub fn new(algorithm: SigningAlgorithm) -> Self {
        Self::with_secret(algorithm, b"keyward-test-secret")
    }

    /// Available custodian with its own secret, to simulate a different key
    #[must_use]
    pub fn with_secret(algorithm: SigningAlgorithm, secret: &[u8]) -> Self {
        Self {
            algorithm,
            secret: secret.to_vec(),
            unavailable: AtomicBool::new(false),
            sign_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// Custodian that fails every call with [`CustodianError::Unreachable`]
    #[must_use]
    pub fn unavailable(algorithm: SigningAlgorithm) -> Self {
        let custodian = Self::new(algorithm);
        custodian.set_available(false);
        custodian
    }

    /// Toggle availability
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of `sign` calls so far
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Number of `verify` calls so far
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(input);
        hasher.finalize().to_vec()
    }

    fn check_available(&self) -> Result<(), CustodianError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CustodianError::Unreachable {
                reason: "fake custodian switched off".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyCustodian for FakeCustodian {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn describe(&self) -> String {
        format!("fake({})", self.algorithm)
    }

    async fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, CustodianError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.digest(signing_input))
    }

    async fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<bool, CustodianError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.digest(signing_input).ct_eq(signature).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_signs_and_counts() {
        let custodian = FakeCustodian::new(SigningAlgorithm::RS256);
        let sig = custodian.sign(b"input").await.unwrap();
        assert!(custodian.verify(b"input", &sig).await.unwrap());
        assert!(!custodian.verify(b"other", &sig).await.unwrap());
        assert_eq!(custodian.sign_calls(), 1);
        assert_eq!(custodian.verify_calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let custodian = FakeCustodian::unavailable(SigningAlgorithm::PS256);
        assert!(matches!(
            custodian.sign(b"x").await,
            Err(CustodianError::Unreachable { .. })
        ));
        custodian.set_available(true);
        assert!(custodian.sign(b"x").await.is_ok());
    }
}
