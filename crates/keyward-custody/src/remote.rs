//! Delegated signing through Vault Transit
//!
//! The private key never leaves Vault. This custodian only moves bytes: the signing input out
//! as standard base64, the signature back inside a [`SignatureEnvelope`].

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use keyward::{CustodianError, KeyCustodian, KeyHandle, SigningAlgorithm};
use tracing::{debug, warn};

use crate::envelope::SignatureEnvelope;
use crate::vault::{TransitSignRequest, TransitVerifyRequest, VaultClient};

/// Default Transit mount
pub const DEFAULT_TRANSIT_MOUNT: &str = "transit";

/// Custodian that asks Vault Transit to sign and verify
///
/// The key version is pinned: `handle.version`, or 1 when unset. Signing requests that
/// version explicitly and rejects a response produced by any other. Tokens carry raw
/// signature bytes without a version, so verification always wraps them for the pinned
/// version. Rotating to a new Transit key version is therefore a configuration change.
#[derive(Debug, Clone)]
pub struct RemoteSigningCustodian {
    client: VaultClient,
    mount: String,
    handle: KeyHandle,
    algorithm: SigningAlgorithm,
}

impl RemoteSigningCustodian {
    /// Custodian for Transit key `handle` under `mount`
    pub fn new(
        client: VaultClient,
        mount: impl Into<String>,
        handle: KeyHandle,
        algorithm: SigningAlgorithm,
    ) -> Self {
        Self {
            client,
            mount: mount.into(),
            handle,
            algorithm,
        }
    }

    /// Key version used for every operation
    #[must_use]
    pub fn pinned_version(&self) -> u32 {
        self.handle.version.unwrap_or(1)
    }

    fn salt_length(&self) -> Option<&'static str> {
        // JWS PS256 uses a salt as long as the digest
        match self.algorithm {
            SigningAlgorithm::PS256 => Some("hash"),
            SigningAlgorithm::RS256 => None,
        }
    }
}

#[async_trait]
impl KeyCustodian for RemoteSigningCustodian {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn describe(&self) -> String {
        format!(
            "transit:{}:{}/{}@v{}",
            self.algorithm,
            self.mount,
            self.handle.name,
            self.pinned_version()
        )
    }

    async fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, CustodianError> {
        let request = TransitSignRequest {
            input: STANDARD.encode(signing_input),
            signature_algorithm: self.algorithm.transit_signature_algorithm(),
            salt_length: self.salt_length(),
            key_version: Some(self.pinned_version()),
        };
        let text = self
            .client
            .transit_sign(&self.mount, &self.handle.name, &request)
            .await?;

        let envelope =
            SignatureEnvelope::parse(&text).map_err(|e| CustodianError::MalformedResponse {
                reason: e.to_string(),
            })?;
        if envelope.version != self.pinned_version() {
            warn!(
                custodian = %self.describe(),
                returned = envelope.version,
                "Transit signed with an unexpected key version"
            );
            return Err(CustodianError::MalformedResponse {
                reason: format!(
                    "signed with key version {}, expected {}",
                    envelope.version,
                    self.pinned_version()
                ),
            });
        }

        debug!(custodian = %self.describe(), "Signed via Transit");
        Ok(envelope.signature)
    }

    async fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<bool, CustodianError> {
        let request = TransitVerifyRequest {
            input: STANDARD.encode(signing_input),
            signature: SignatureEnvelope::new(self.pinned_version(), signature).encode(),
            signature_algorithm: self.algorithm.transit_signature_algorithm(),
            salt_length: self.salt_length(),
        };
        self.client
            .transit_verify(&self.mount, &self.handle.name, &request)
            .await
    }
}
