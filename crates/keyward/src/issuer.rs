//! Token issuance

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

use crate::algorithm::SigningAlgorithm;
use crate::claims::Claims;
use crate::codec::{self, TokenHeader, WireToken};
use crate::config::TokenConfig;
use crate::custodian::KeyCustodian;
use crate::errors::{ConfigError, IssueError};

/// Builds claims for an authenticated subject and has the custodian sign them
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    issuer: String,
    algorithm: SigningAlgorithm,
    lifetime: Duration,
    custodian: Arc<dyn KeyCustodian>,
}

impl TokenIssuer {
    /// Create an issuer
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid or names a different algorithm than
    /// the custodian signs with.
    pub fn new(config: &TokenConfig, custodian: Arc<dyn KeyCustodian>) -> Result<Self, ConfigError> {
        config.validate_for(custodian.as_ref())?;
        Ok(Self {
            issuer: config.issuer.clone(),
            algorithm: config.algorithm,
            lifetime: config.lifetime(),
            custodian,
        })
    }

    /// Issuer tag written into every token
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for a subject, valid from `now` for the configured lifetime
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::SigningFailed`] if the custodian cannot sign. No token is
    /// produced in that case.
    pub async fn issue(
        &self,
        subject_id: i64,
        subject_name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<WireToken, IssueError> {
        let claims = Claims::new_for(
            subject_id,
            subject_name,
            email,
            &self.issuer,
            now,
            self.lifetime,
        )?;
        let header = TokenHeader::new(self.algorithm);
        let signing_input = codec::signing_input(&header, &claims);

        let signature = self
            .custodian
            .sign(signing_input.as_bytes())
            .await
            .inspect_err(|e| {
                error!(
                    custodian = %self.custodian.describe(),
                    subject_id,
                    error = %e,
                    "Token signing failed"
                );
            })?;

        debug!(
            custodian = %self.custodian.describe(),
            subject_id,
            expires_at = %claims.expires_at,
            "Issued token"
        );

        Ok(codec::attach_signature(&signing_input, &signature))
    }
}
