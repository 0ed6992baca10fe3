//! Token configuration
//!
//! Built once at startup and passed to [`TokenIssuer`](crate::TokenIssuer) and
//! [`TokenVerifier`](crate::TokenVerifier) constructors.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_TOKEN_LIFETIME_SECS;
use crate::algorithm::SigningAlgorithm;
use crate::custodian::KeyCustodian;
use crate::errors::ConfigError;

/// Settings shared by issuance and verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Issuer tag written into `iss` and required on verification
    pub issuer: String,
    /// The single algorithm this deployment accepts
    pub algorithm: SigningAlgorithm,
    /// Token lifetime in seconds
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: i64,
}

fn default_lifetime_secs() -> i64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

impl TokenConfig {
    /// Configuration with the default 24 hour lifetime
    pub fn new(issuer: impl Into<String>, algorithm: SigningAlgorithm) -> Self {
        Self {
            issuer: issuer.into(),
            algorithm,
            lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }

    /// Override the lifetime
    #[must_use]
    pub fn with_lifetime_secs(mut self, lifetime_secs: i64) -> Self {
        self.lifetime_secs = lifetime_secs;
        self
    }

    /// Token lifetime as a duration
    ///
    /// An unrepresentable lifetime maps to zero, which issuance rejects.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        Duration::try_seconds(self.lifetime_secs).unwrap_or_else(Duration::zero)
    }

    /// Check the values themselves
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty issuer, a non-positive lifetime, or
    /// a lifetime whose expiry would not be a representable timestamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "issuer",
                reason: "must not be empty".to_string(),
            });
        }
        if self.lifetime_secs <= 0 || Duration::try_seconds(self.lifetime_secs).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "lifetime_secs",
                reason: format!("must be a positive number of seconds, got {}", self.lifetime_secs),
            });
        }
        if Utc::now().checked_add_signed(self.lifetime()).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "lifetime_secs",
                reason: format!("expiry {}s from now is out of range", self.lifetime_secs),
            });
        }
        Ok(())
    }

    /// Check the values and that `custodian` signs with the configured algorithm
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlgorithmMismatch`] if the custodian uses another algorithm.
    pub fn validate_for(&self, custodian: &dyn KeyCustodian) -> Result<(), ConfigError> {
        self.validate()?;
        if custodian.algorithm() != self.algorithm {
            return Err(ConfigError::AlgorithmMismatch {
                configured: self.algorithm.to_string(),
                custodian: custodian.algorithm().to_string(),
            });
        }
        Ok(())
    }
}
