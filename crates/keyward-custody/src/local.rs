//! In-process signing with fetched key material

use std::sync::Arc;

use async_trait::async_trait;
use keyward::{CustodianError, KeyCustodian, SigningAlgorithm};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey, pkcs1v15, pss};
use sha2::Sha256;
use tracing::debug;

use crate::source::KeyMaterialSource;

/// Custodian that fetches PEM key material and signs locally
///
/// Key material is fetched for every call and dropped when the call returns. The private key
/// PEM is held in a zeroizing buffer and the parsed key zeroizes itself on drop.
#[derive(Debug, Clone)]
pub struct LocalKeyCustodian {
    algorithm: SigningAlgorithm,
    source: Arc<dyn KeyMaterialSource>,
}

impl LocalKeyCustodian {
    /// Custodian signing with `algorithm` using keys from `source`
    pub fn new(algorithm: SigningAlgorithm, source: Arc<dyn KeyMaterialSource>) -> Self {
        Self { algorithm, source }
    }
}

#[async_trait]
impl KeyCustodian for LocalKeyCustodian {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn describe(&self) -> String {
        format!("local:{}:{}", self.algorithm, self.source.describe())
    }

    async fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, CustodianError> {
        let pem = self.source.private_key_pem().await?;
        let algorithm = self.algorithm;
        let message = signing_input.to_vec();
        let signature = run_blocking(move || {
            let key = parse_private_key(&pem)?;
            sign_with(algorithm, key, &message)
        })
        .await?;
        debug!(custodian = %self.describe(), len = signature.len(), "Signed locally");
        Ok(signature)
    }

    async fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<bool, CustodianError> {
        let pem = self.source.public_key_pem().await?;
        let algorithm = self.algorithm;
        let message = signing_input.to_vec();
        let signature = signature.to_vec();
        run_blocking(move || {
            let key = parse_public_key(&pem)?;
            Ok(verify_with(algorithm, key, &message, &signature))
        })
        .await
    }
}

/// Run key parsing and RSA arithmetic off the async executor
async fn run_blocking<T, F>(work: F) -> Result<T, CustodianError>
where
    F: FnOnce() -> Result<T, CustodianError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CustodianError::InvalidKeyMaterial {
            reason: format!("key operation did not complete: {e}"),
        })?
}

/// Parse a PKCS#8 or PKCS#1 RSA private key
pub(crate) fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CustodianError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CustodianError::InvalidKeyMaterial {
            reason: format!("private key is neither PKCS#8 nor PKCS#1 RSA PEM: {e}"),
        })
}

/// Parse an SPKI or PKCS#1 RSA public key
pub(crate) fn parse_public_key(pem: &str) -> Result<RsaPublicKey, CustodianError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| CustodianError::InvalidKeyMaterial {
            reason: format!("public key is neither SPKI nor PKCS#1 RSA PEM: {e}"),
        })
}

fn sign_with(
    algorithm: SigningAlgorithm,
    key: RsaPrivateKey,
    message: &[u8],
) -> Result<Vec<u8>, CustodianError> {
    let signed = match algorithm {
        SigningAlgorithm::RS256 => pkcs1v15::SigningKey::<Sha256>::new(key)
            .try_sign(message)
            .map(|s| s.to_vec()),
        SigningAlgorithm::PS256 => pss::BlindedSigningKey::<Sha256>::new(key)
            .try_sign_with_rng(&mut OsRng, message)
            .map(|s| s.to_vec()),
    };
    signed.map_err(|e| CustodianError::InvalidKeyMaterial {
        reason: format!("signing failed: {e}"),
    })
}

fn verify_with(
    algorithm: SigningAlgorithm,
    key: RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> bool {
    match algorithm {
        SigningAlgorithm::RS256 => pkcs1v15::Signature::try_from(signature).is_ok_and(|sig| {
            pkcs1v15::VerifyingKey::<Sha256>::new(key)
                .verify(message, &sig)
                .is_ok()
        }),
        SigningAlgorithm::PS256 => pss::Signature::try_from(signature).is_ok_and(|sig| {
            pss::VerifyingKey::<Sha256>::new(key)
                .verify(message, &sig)
                .is_ok()
        }),
    }
}
