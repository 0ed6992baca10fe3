//! Login and protected-resource flows
//!
//! Ties the directory, the password hasher and the token layer together. This is the part
//! a web layer would call from its login handler and its per-user resource handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::access::{AccessDenied, authorize_subject};
use crate::codec::WireToken;
use crate::directory::{DirectoryError, UserDirectory, UserProfile};
use crate::errors::IssueError;
use crate::issuer::TokenIssuer;
use crate::password::PasswordHasher;
use crate::verifier::TokenVerifier;

/// Login failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Username or password was empty
    #[error("Username and password are required")]
    MissingCredentials,

    /// Unknown user or wrong password; deliberately not distinguished
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The directory could not be queried
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Credentials were fine but no token could be issued
    #[error(transparent)]
    Issue(#[from] IssueError),
}

/// A successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Token to hand to the client
    pub token: WireToken,
    /// Profile of the authenticated user
    pub profile: UserProfile,
}

/// Authenticates users and serves their own profile
#[derive(Debug, Clone)]
pub struct SessionService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
}

impl SessionService {
    /// Assemble the service from its collaborators
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            directory,
            hasher,
            issuer,
            verifier,
        }
    }

    /// Check credentials and issue a token
    ///
    /// # Errors
    ///
    /// See [`LoginError`]. An unknown user and a wrong password both yield
    /// [`LoginError::InvalidCredentials`].
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, LoginError> {
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let Some(record) = self.directory.find_by_username(username).await? else {
            warn!(username, "Login for unknown user");
            return Err(LoginError::InvalidCredentials);
        };
        if !self.hasher.verify(password, &record.password_hash) {
            warn!(username, "Login with wrong password");
            return Err(LoginError::InvalidCredentials);
        }

        let token = self
            .issuer
            .issue(record.id, &record.username, &record.email, now)
            .await?;

        info!(user_id = record.id, issuer = self.issuer.issuer(), "Login succeeded");
        Ok(Session {
            token,
            profile: record.profile(),
        })
    }

    /// Return the profile for `requested_id` if `token` is a valid token for that subject
    ///
    /// # Errors
    ///
    /// See [`AccessDenied`]. A directory failure maps to
    /// [`AccessDenied::ServiceUnavailable`].
    pub async fn user_profile(
        &self,
        token: &str,
        requested_id: i64,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AccessDenied> {
        let outcome = self.verifier.verify(token, now).await;
        let claims = authorize_subject(outcome, requested_id)?;

        match self.directory.find_by_id(claims.subject_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(AccessDenied::NotFound {
                id: claims.subject_id,
            }),
            Err(e) => {
                error!(error = %e, "User lookup failed");
                Err(AccessDenied::ServiceUnavailable {
                    reason: e.to_string(),
                })
            }
        }
    }
}
