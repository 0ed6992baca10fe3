//! User directory
//!
//! The login flow and protected-resource lookups need two queries: by username (with the
//! credential hash) and by id (without it). Storage is pluggable through [`UserDirectory`];
//! [`InMemoryUserDirectory`] covers tests, the CLI and small fixed user sets.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Directory lookup failures
///
/// A missing user is not an error; lookups return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The backing store could not be queried
    #[error("User store unavailable: {reason}")]
    Unavailable {
        /// Underlying failure
        reason: String,
    },

    /// Records could not be loaded
    #[error("Invalid user data: {reason}")]
    InvalidData {
        /// What was wrong
        reason: String,
    },
}

/// Full user record, including the credential hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Subject identifier
    pub id: i64,
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Phone number
    #[serde(default)]
    pub phone_num: Option<String>,
    /// Postal address
    #[serde(default)]
    pub address: Option<String>,
    /// Output of the configured [`PasswordHasher`](crate::PasswordHasher)
    pub password_hash: String,
}

impl UserRecord {
    /// The record without its credential hash
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            phone_num: self.phone_num.clone(),
            address: self.address.clone(),
        }
    }
}

/// What a protected-resource lookup returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Subject identifier
    pub id: i64,
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone_num: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

/// Lookup of users by name or id
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Find a user, including the credential hash, by login name
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Find a user's profile by id
    async fn find_by_id(&self, id: i64) -> Result<Option<UserProfile>, DirectoryError>;

    /// All profiles, ordered by id
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, DirectoryError>;
}

/// Directory held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    by_id: HashMap<i64, UserRecord>,
    id_by_username: HashMap<String, i64>,
}

impl InMemoryUserDirectory {
    /// Build from records
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidData`] if two records share an id or a username.
    pub fn new(records: Vec<UserRecord>) -> Result<Self, DirectoryError> {
        let mut directory = Self::default();
        for record in records {
            if directory.by_id.contains_key(&record.id) {
                return Err(DirectoryError::InvalidData {
                    reason: format!("duplicate user id {}", record.id),
                });
            }
            if directory.id_by_username.contains_key(&record.username) {
                return Err(DirectoryError::InvalidData {
                    reason: format!("duplicate username '{}'", record.username),
                });
            }
            directory
                .id_by_username
                .insert(record.username.clone(), record.id);
            directory.by_id.insert(record.id, record);
        }
        Ok(directory)
    }

    /// Load a JSON array of [`UserRecord`]s
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] if the file cannot be read and
    /// [`DirectoryError::InvalidData`] if it does not parse or has duplicates.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DirectoryError::Unavailable {
                reason: format!("{}: {e}", path.display()),
            })?;
        let records: Vec<UserRecord> =
            serde_json::from_slice(&bytes).map_err(|e| DirectoryError::InvalidData {
                reason: format!("{}: {e}", path.display()),
            })?;
        debug!(path = %path.display(), users = records.len(), "Loaded user directory");
        Self::new(records)
    }

    /// Number of users
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the directory has no users
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self
            .id_by_username
            .get(username)
            .and_then(|id| self.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.by_id.get(&id).map(UserRecord::profile))
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, DirectoryError> {
        let mut profiles: Vec<UserProfile> = self.by_id.values().map(UserRecord::profile).collect();
        profiles.sort_by_key(|p| p.id);
        Ok(profiles)
    }
}
