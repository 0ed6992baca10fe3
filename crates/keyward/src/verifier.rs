//! Token verification
//!
//! Order of checks, first failure wins:
//!
//! 1. Structural decode
//! 2. Header algorithm and type, signature presence, issuer tag, validity window. These are
//!    rejected as [`VerificationOutcome::Malformed`] without calling the custodian.
//! 3. Custodian signature check over the exact signing input received
//! 4. Expiry
//!
//! Each call is independent. Nothing learned from one token is trusted for the next.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::TOKEN_TYPE;
use crate::algorithm::SigningAlgorithm;
use crate::claims::Claims;
use crate::codec::{self, DecodedToken};
use crate::config::TokenConfig;
use crate::custodian::KeyCustodian;
use crate::errors::{ConfigError, CustodianError, MalformedToken};

/// Result of a single verification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Signature checked, token within its lifetime
    Valid(Claims),
    /// Signature checked but the token is past `expires_at`
    ///
    /// The claims are returned so callers can tell a stale session from a forged one.
    /// They must not be used for authorization.
    Expired(Claims),
    /// The custodian checked the signature and rejected it
    SignatureInvalid,
    /// The token was rejected before any cryptographic check
    Malformed(MalformedToken),
    /// No decision could be made because the custodian failed
    CustodianUnavailable(CustodianError),
}

impl VerificationOutcome {
    /// Whether the token may be honored
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Claims of a `Valid` or `Expired` outcome
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Valid(claims) | Self::Expired(claims) => Some(claims),
            _ => None,
        }
    }

    /// Short label, suitable for logs and metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Expired(_) => "expired",
            Self::SignatureInvalid => "signature_invalid",
            Self::Malformed(_) => "malformed",
            Self::CustodianUnavailable(_) => "custodian_unavailable",
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(claims) => write!(f, "valid (subject {})", claims.subject_id),
            Self::Expired(claims) => write!(f, "expired at {}", claims.expires_at),
            Self::SignatureInvalid => f.write_str("signature invalid"),
            Self::Malformed(reason) => write!(f, "malformed: {reason}"),
            Self::CustodianUnavailable(reason) => write!(f, "custodian unavailable: {reason}"),
        }
    }
}

/// Verifies wire tokens against a single algorithm and issuer tag
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    algorithm: SigningAlgorithm,
    custodian: Arc<dyn KeyCustodian>,
}

impl TokenVerifier {
    /// Create a verifier
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid or names a different algorithm than
    /// the custodian verifies with.
    pub fn new(config: &TokenConfig, custodian: Arc<dyn KeyCustodian>) -> Result<Self, ConfigError> {
        config.validate_for(custodian.as_ref())?;
        Ok(Self {
            issuer: config.issuer.clone(),
            algorithm: config.algorithm,
            custodian,
        })
    }

    /// Verify `wire` as of `now`
    pub async fn verify(&self, wire: &str, now: DateTime<Utc>) -> VerificationOutcome {
        let decoded = match codec::decode(wire) {
            Ok(decoded) => decoded,
            Err(reason) => {
                debug!(error = %reason, "Rejected undecodable token");
                return VerificationOutcome::Malformed(reason);
            }
        };

        if let Err(reason) = self.check_structure(&decoded) {
            debug!(
                error = %reason,
                alg = %decoded.header.alg,
                subject_id = decoded.claims.subject_id,
                "Rejected token before signature check"
            );
            return VerificationOutcome::Malformed(reason);
        }

        // Verify the bytes exactly as received, never a re-encoding of the decoded parts
        let checked = self
            .custodian
            .verify(decoded.signing_input.as_bytes(), &decoded.signature)
            .await;

        match checked {
            Err(e) => {
                error!(
                    custodian = %self.custodian.describe(),
                    error = %e,
                    "Custodian could not verify token"
                );
                VerificationOutcome::CustodianUnavailable(e)
            }
            Ok(false) => {
                warn!(
                    custodian = %self.custodian.describe(),
                    subject_id = decoded.claims.subject_id,
                    "Token signature rejected, possible tampering"
                );
                VerificationOutcome::SignatureInvalid
            }
            Ok(true) if decoded.claims.is_expired_at(now) => {
                debug!(
                    subject_id = decoded.claims.subject_id,
                    expires_at = %decoded.claims.expires_at,
                    "Token expired"
                );
                VerificationOutcome::Expired(decoded.claims)
            }
            Ok(true) => VerificationOutcome::Valid(decoded.claims),
        }
    }

    fn check_structure(&self, decoded: &DecodedToken) -> Result<(), MalformedToken> {
        if !self.algorithm.matches_header(&decoded.header.alg) {
            return Err(MalformedToken::AlgorithmRejected {
                found: decoded.header.alg.clone(),
                expected: self.algorithm.to_string(),
            });
        }
        if let Some(typ) = &decoded.header.typ
            && typ != TOKEN_TYPE
        {
            return Err(MalformedToken::TypeRejected { found: typ.clone() });
        }
        if decoded.signature.is_empty() {
            return Err(MalformedToken::EmptySignature);
        }
        if decoded.claims.issuer != self.issuer {
            return Err(MalformedToken::IssuerRejected {
                found: decoded.claims.issuer.clone(),
            });
        }
        if !decoded.claims.has_valid_lifetime() {
            return Err(MalformedToken::InvalidLifetime);
        }
        Ok(())
    }
}
