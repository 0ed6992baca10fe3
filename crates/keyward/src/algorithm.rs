//! Signature algorithm selection
//!
//! A deployment accepts exactly one algorithm. Anything else found in a token header,
//! including `none`, is rejected before a custodian is consulted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// RSA signature algorithms supported by the custodians (RFC 7518 names)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSA with PKCS#1 v1.5 padding and SHA-256
    #[serde(rename = "RS256")]
    RS256,

    /// RSA with PSS padding and SHA-256
    #[serde(rename = "PS256")]
    PS256,
}

impl SigningAlgorithm {
    /// Get the algorithm name as it appears in the token header
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::PS256 => "PS256",
        }
    }

    /// Name of the padding scheme as understood by Vault Transit
    #[must_use]
    pub fn transit_signature_algorithm(self) -> &'static str {
        match self {
            Self::RS256 => "pkcs1v15",
            Self::PS256 => "pss",
        }
    }

    /// Whether a header `alg` value names exactly this algorithm
    #[must_use]
    pub fn matches_header(self, alg: &str) -> bool {
        alg == self.as_str()
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "PS256" => Ok(Self::PS256),
            other => Err(ConfigError::UnsupportedAlgorithm {
                algorithm: other.to_string(),
            }),
        }
    }
}
