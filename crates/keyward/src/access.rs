//! Subject check for protected resources
//!
//! A [`VerificationOutcome::Valid`] only says the token is genuine. Any handler that looks
//! up a resource by an identifier taken from the request must also confirm that the
//! identifier is the token's subject. [`authorize_subject`] does both in one step so that
//! callers have no way to accept a token without the comparison.

use http::StatusCode;
use thiserror::Error;
use tracing::warn;

use crate::claims::Claims;
use crate::verifier::VerificationOutcome;

/// Why a request for a subject's resource was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    /// No acceptable token (malformed, forged or expired)
    #[error("Authentication required: {reason}")]
    Unauthenticated {
        /// Verification outcome that caused the refusal
        reason: String,
    },

    /// The token is valid but belongs to someone else
    #[error("Token subject {token_subject} may not access subject {requested}")]
    SubjectMismatch {
        /// Subject asserted by the token
        token_subject: i64,
        /// Subject the request asked for
        requested: i64,
    },

    /// The token could not be checked
    #[error("Token could not be verified: {reason}")]
    ServiceUnavailable {
        /// Custodian failure
        reason: String,
    },

    /// The subject is authorized but does not exist
    #[error("Subject {id} not found")]
    NotFound {
        /// Requested subject
        id: i64,
    },
}

impl AccessDenied {
    /// HTTP status a web boundary should answer with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::SubjectMismatch { .. } => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }
}

/// Accept `outcome` only if it is valid and asserts `requested_id`
///
/// # Errors
///
/// - [`AccessDenied::ServiceUnavailable`] when the custodian could not decide
/// - [`AccessDenied::Unauthenticated`] for every other non-valid outcome
/// - [`AccessDenied::SubjectMismatch`] when the token names another subject
pub fn authorize_subject(
    outcome: VerificationOutcome,
    requested_id: i64,
) -> Result<Claims, AccessDenied> {
    let claims = match outcome {
        VerificationOutcome::Valid(claims) => claims,
        VerificationOutcome::CustodianUnavailable(e) => {
            return Err(AccessDenied::ServiceUnavailable {
                reason: e.to_string(),
            });
        }
        other => {
            return Err(AccessDenied::Unauthenticated {
                reason: other.to_string(),
            });
        }
    };

    if claims.subject_id != requested_id {
        warn!(
            token_subject = claims.subject_id,
            requested = requested_id,
            "Subject mismatch on protected resource"
        );
        return Err(AccessDenied::SubjectMismatch {
            token_subject: claims.subject_id,
            requested: requested_id,
        });
    }

    Ok(claims)
}
