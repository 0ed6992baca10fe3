//! Key custody abstraction
//!
//! A custodian either holds key material it fetched from a store and signs in-process, or
//! forwards the operation to a remote service and never sees raw key bytes. Issuers and
//! verifiers only see this trait and cannot tell which kind they are talking to.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::algorithm::SigningAlgorithm;
use crate::errors::CustodianError;

/// Logical name of the key a custodian should use
///
/// Owned by configuration. For a key-value store this is the secret path; for a remote
/// signing service it is the key name. `version` pins a specific key version when set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHandle {
    /// Logical key name or secret path
    pub name: String,
    /// Specific key version, latest when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl KeyHandle {
    /// Handle for the latest version of `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Pin the handle to a specific version
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}@v{}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// Signing and verification backed by externally managed key material
///
/// Implementations must be safe for concurrent use and must not cache trust between
/// calls. Every method may perform network I/O bounded by the implementation's timeout.
#[async_trait]
pub trait KeyCustodian: Send + Sync + fmt::Debug {
    /// Algorithm this custodian signs and verifies with
    fn algorithm(&self) -> SigningAlgorithm;

    /// Short description for logs (never includes secrets)
    fn describe(&self) -> String;

    /// Sign `signing_input`, returning raw signature bytes
    async fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, CustodianError>;

    /// Check `signature` over `signing_input`
    ///
    /// `Ok(false)` means the signature was checked and rejected; `Err` means no decision
    /// could be made.
    async fn verify(&self, signing_input: &[u8], signature: &[u8]) -> Result<bool, CustodianError>;
}
