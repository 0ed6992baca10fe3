//! Vault Transit signature envelope
//!
//! Transit returns and accepts signatures as `vault:v{key_version}:{standard base64}`.
//! Tokens carry raw signature bytes in base64url. This module converts between the two
//! and nothing else: there is no guessing about inputs that are "probably already encoded".

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

const PREFIX: &str = "vault:v";

/// Why an envelope string was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Does not start with `vault:v`
    #[error("Signature envelope must start with '{PREFIX}'")]
    MissingPrefix,

    /// Version is not a canonical decimal number of at least 1
    #[error("Invalid key version '{found}' in signature envelope")]
    InvalidVersion {
        /// Text found where the version was expected
        found: String,
    },

    /// Signature part is not canonical padded standard base64
    #[error("Signature envelope payload is not valid base64")]
    InvalidEncoding,

    /// Signature part is empty
    #[error("Signature envelope carries no signature")]
    EmptySignature,
}

/// A raw signature tagged with the key version that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    /// Key version, starting at 1
    pub version: u32,
    /// Raw signature bytes
    pub signature: Vec<u8>,
}

impl SignatureEnvelope {
    /// Wrap raw signature bytes
    pub fn new(version: u32, signature: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            signature: signature.into(),
        }
    }

    /// Envelope text as Transit expects it
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{PREFIX}{}:{}", self.version, STANDARD.encode(&self.signature))
    }

    /// Parse envelope text strictly
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] for anything but `vault:v{N}:{base64}` with `N >= 1` written
    /// without leading zeros and a non-empty, canonically padded payload.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let rest = text.strip_prefix(PREFIX).ok_or(EnvelopeError::MissingPrefix)?;
        let (version, payload) = rest.split_once(':').ok_or_else(|| EnvelopeError::InvalidVersion {
            found: rest.to_string(),
        })?;

        let canonical = !version.is_empty()
            && !version.starts_with('0')
            && version.bytes().all(|b| b.is_ascii_digit());
        let version = canonical
            .then(|| version.parse::<u32>().ok())
            .flatten()
            .ok_or_else(|| EnvelopeError::InvalidVersion {
                found: version.to_string(),
            })?;

        if payload.is_empty() {
            return Err(EnvelopeError::EmptySignature);
        }
        let signature = STANDARD
            .decode(payload)
            .map_err(|_| EnvelopeError::InvalidEncoding)?;

        Ok(Self { version, signature })
    }
}

impl fmt::Display for SignatureEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
