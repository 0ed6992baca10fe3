//! Error types for token issuance, decoding and key custody
//!
//! The split matters: [`CustodianError`] describes infrastructure faults (the key could not be
//! used), [`MalformedToken`] describes client input that was structurally unacceptable. The
//! verifier keeps them apart so an outage is never reported as a bad token and a bad token is
//! never reported as an outage.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Failure of a key custodian to perform a cryptographic operation
///
/// Every variant surfaces as `CustodianUnavailable` (verification) or
/// `SigningFailed` (issuance) at the token layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodianError {
    /// The custodian could not be contacted
    #[error("Custodian unreachable: {reason}")]
    Unreachable {
        /// What went wrong at the transport level
        reason: String,
    },

    /// The custodian call exceeded its timeout
    #[error("Custodian call timed out after {timeout:?}")]
    Timeout {
        /// Configured timeout
        timeout: Duration,
    },

    /// The custodian refused our credentials
    #[error("Custodian rejected credentials")]
    Unauthenticated,

    /// The logical key path does not exist
    #[error("Secret '{path}' not found")]
    SecretNotFound {
        /// Logical path that was requested
        path: String,
    },

    /// The secret exists but lacks the requested field
    #[error("Secret '{path}' has no field '{field}'")]
    MissingField {
        /// Logical path that was read
        path: String,
        /// Field that was expected
        field: String,
    },

    /// Key material was present but could not be parsed or used
    #[error("Invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// Parser or crypto library message
        reason: String,
    },

    /// The custodian answered with something we could not interpret
    #[error("Malformed custodian response: {reason}")]
    MalformedResponse {
        /// What was wrong with the response
        reason: String,
    },

    /// The custodian answered with an unexpected status
    #[error("Custodian returned status {status}: {reason}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error text returned by the custodian, if any
        reason: String,
    },
}

/// Which segment of a wire token failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// First segment
    Header,
    /// Second segment
    Claims,
    /// Third segment
    Signature,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Claims => "claims",
            Self::Signature => "signature",
        })
    }
}

/// Reasons a wire token is rejected before any cryptographic check
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedToken {
    /// Not exactly three dot-separated segments
    #[error("Expected 3 segments, found {found}")]
    SegmentCount {
        /// Number of segments present
        found: usize,
    },

    /// A segment is not valid unpadded base64url
    #[error("Segment '{segment}' is not valid base64url")]
    Encoding {
        /// Offending segment
        segment: Segment,
    },

    /// The header is not a valid JSON header object
    #[error("Invalid header: {reason}")]
    Header {
        /// Parser message
        reason: String,
    },

    /// The claims segment does not match the claims schema
    #[error("Invalid claims: {reason}")]
    Claims {
        /// Parser message
        reason: String,
    },

    /// The signature segment is empty
    #[error("Signature segment is empty")]
    EmptySignature,

    /// Header names an algorithm this deployment does not accept
    #[error("Algorithm '{found}' not accepted, expected '{expected}'")]
    AlgorithmRejected {
        /// Algorithm named by the token
        found: String,
        /// Algorithm the deployment accepts
        expected: String,
    },

    /// Header `typ` is present and is not `JWT`
    #[error("Token type '{found}' not accepted")]
    TypeRejected {
        /// Type named by the token
        found: String,
    },

    /// Token was produced by a different signing path
    #[error("Issuer '{found}' not accepted")]
    IssuerRejected {
        /// Issuer named by the token
        found: String,
    },

    /// `exp` is not after `iat`
    #[error("Token lifetime is empty or negative")]
    InvalidLifetime,
}

/// Token issuance failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// The custodian could not produce a signature
    #[error("Signing failed: {source}")]
    SigningFailed {
        /// Underlying custodian failure
        #[from]
        source: CustodianError,
    },

    /// The requested validity window cannot be represented
    #[error("Invalid token lifetime: {reason}")]
    InvalidLifetime {
        /// Why the window was rejected
        reason: String,
    },
}

/// Configuration errors detected at construction time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Algorithm name not supported
    #[error("Unsupported algorithm '{algorithm}'")]
    UnsupportedAlgorithm {
        /// Name that was supplied
        algorithm: String,
    },

    /// Configured algorithm differs from the one the custodian signs with
    #[error("Configured algorithm {configured} does not match custodian algorithm {custodian}")]
    AlgorithmMismatch {
        /// Algorithm from configuration
        configured: String,
        /// Algorithm the custodian uses
        custodian: String,
    },

    /// A configuration value is missing or out of range
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
