//! # Keyward - Custodian-backed identity tokens
//!
//! Issues and verifies compact signed identity tokens (`header.claims.signature`, the standard
//! JWS compact layout) where the signing key is owned by an external custodian rather than by
//! the application.
//!
//! ## Architecture
//!
//! - [`algorithm`] - The single signature algorithm a deployment accepts
//! - [`claims`] - Token payload
//! - [`codec`] - Pure encode/decode of the three-part wire form, no cryptographic judgment
//! - [`custodian`] - The `KeyCustodian` trait implemented by key custody backends
//! - [`issuer`] / [`verifier`] - Issuance and the strict verification state machine
//! - [`access`] - The subject check every caller must apply to a verified token
//! - [`directory`], [`password`], [`session`] - User lookup, credential digests and the login flow
//!
//! Custodian implementations (Vault KV, filesystem PEM, Vault Transit) live in the
//! `keyward-custody` crate.
//!
//! ## Verification outcomes
//!
//! Verification never returns a bare boolean. A custodian that cannot be reached yields
//! [`VerificationOutcome::CustodianUnavailable`], which is distinct from
//! [`VerificationOutcome::SignatureInvalid`]; neither is ever turned into an accepted token.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use keyward::{SigningAlgorithm, TokenConfig, TokenIssuer, TokenVerifier, VerificationOutcome};
//! # use keyward::testing::FakeCustodian;
//!
//! # tokio_test::block_on(async {
//! let custodian = Arc::new(FakeCustodian::new(SigningAlgorithm::RS256));
//! let config = TokenConfig::new("keyward-kv", SigningAlgorithm::RS256);
//!
//! let issuer = TokenIssuer::new(&config, custodian.clone())?;
//! let verifier = TokenVerifier::new(&config, custodian)?;
//!
//! let now = Utc::now();
//! let token = issuer.issue(7, "alice", "alice@example.com", now).await?;
//! match verifier.verify(token.as_str(), now).await {
//!     VerificationOutcome::Valid(claims) => assert_eq!(claims.subject_id, 7),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod access;
pub mod algorithm;
pub mod claims;
pub mod codec;
pub mod config;
pub mod custodian;
pub mod directory;
pub mod errors;
pub mod issuer;
pub mod password;
pub mod session;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use access::{AccessDenied, authorize_subject};
pub use algorithm::SigningAlgorithm;
pub use claims::Claims;
pub use codec::{DecodedToken, TokenHeader, WireToken};
pub use config::TokenConfig;
pub use custodian::{KeyCustodian, KeyHandle};
pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory, UserProfile, UserRecord};
pub use errors::{ConfigError, CustodianError, IssueError, MalformedToken, Segment};
pub use issuer::TokenIssuer;
pub use password::{PasswordHasher, Sha256PasswordHasher};
pub use session::{LoginError, Session, SessionService};
pub use verifier::{TokenVerifier, VerificationOutcome};

/// Token type carried in the header `typ` field
pub const TOKEN_TYPE: &str = "JWT";

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;
