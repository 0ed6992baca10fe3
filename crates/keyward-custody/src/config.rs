//! Custody selection
//!
//! Which custodian a deployment uses is pure configuration. Callers build one
//! `Arc<dyn KeyCustodian>` at startup and hand it to the issuer and verifier.

use std::path::PathBuf;
use std::sync::Arc;

use keyward::{ConfigError, KeyCustodian, KeyHandle, SigningAlgorithm};
use serde::Deserialize;
use tracing::info;

use crate::local::LocalKeyCustodian;
use crate::remote::{DEFAULT_TRANSIT_MOUNT, RemoteSigningCustodian};
use crate::source::{
    DEFAULT_KV_MOUNT, DEFAULT_KV_PATH, DEFAULT_PRIVATE_KEY_FIELD, DEFAULT_PUBLIC_KEY_FIELD,
    FileKeySource, VaultKvSource,
};
use crate::vault::{VaultClient, VaultConfig};

/// How signing keys are held
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustodyConfig {
    /// PEM pair in a Vault KV v2 secret, signed locally
    VaultKv {
        /// Vault connection
        vault: VaultConfig,
        /// KV engine mount
        #[serde(default = "default_kv_mount")]
        mount: String,
        /// Secret path
        #[serde(default = "default_key_name")]
        path: String,
        /// Secret version, latest when unset
        #[serde(default)]
        version: Option<u32>,
        /// Field with the private key PEM
        #[serde(default = "default_private_key_field")]
        private_key_field: String,
        /// Field with the public key PEM
        #[serde(default = "default_public_key_field")]
        public_key_field: String,
    },

    /// PEM pair on the local filesystem, signed locally
    Filesystem {
        /// Private key PEM file
        private_key_path: PathBuf,
        /// Public key PEM file
        public_key_path: PathBuf,
    },

    /// Key held by Vault Transit, signed remotely
    VaultTransit {
        /// Vault connection
        vault: VaultConfig,
        /// Transit engine mount
        #[serde(default = "default_transit_mount")]
        mount: String,
        /// Transit key name
        #[serde(default = "default_key_name")]
        key_name: String,
        /// Pinned key version, 1 when unset
        #[serde(default)]
        key_version: Option<u32>,
    },
}

fn default_kv_mount() -> String {
    DEFAULT_KV_MOUNT.to_string()
}

fn default_transit_mount() -> String {
    DEFAULT_TRANSIT_MOUNT.to_string()
}

fn default_key_name() -> String {
    DEFAULT_KV_PATH.to_string()
}

fn default_private_key_field() -> String {
    DEFAULT_PRIVATE_KEY_FIELD.to_string()
}

fn default_public_key_field() -> String {
    DEFAULT_PUBLIC_KEY_FIELD.to_string()
}

impl CustodyConfig {
    /// Short name of the selected strategy
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VaultKv { .. } => "vault_kv",
            Self::Filesystem { .. } => "filesystem",
            Self::VaultTransit { .. } => "vault_transit",
        }
    }

    /// Issuer tag used when the deployment does not configure one
    ///
    /// Each signing path gets its own tag so tokens from one path are not accepted by
    /// another.
    #[must_use]
    pub fn default_issuer(&self) -> &'static str {
        match self {
            Self::VaultKv { .. } => "vault-kv-app",
            Self::Filesystem { .. } => "local-key-app",
            Self::VaultTransit { .. } => "vault-transit-app",
        }
    }

    /// Vault connection, if the strategy uses one
    #[must_use]
    pub fn vault(&self) -> Option<&VaultConfig> {
        match self {
            Self::VaultKv { vault, .. } | Self::VaultTransit { vault, .. } => Some(vault),
            Self::Filesystem { .. } => None,
        }
    }

    /// Build the custodian
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the Vault connection settings are invalid or a name is
    /// empty.
    pub fn build(&self, algorithm: SigningAlgorithm) -> Result<Arc<dyn KeyCustodian>, ConfigError> {
        let custodian: Arc<dyn KeyCustodian> = match self {
            Self::VaultKv {
                vault,
                mount,
                path,
                version,
                private_key_field,
                public_key_field,
            } => {
                require_non_empty("mount", mount)?;
                require_non_empty("path", path)?;
                let client = VaultClient::new(vault)?;
                let source = VaultKvSource::new(client, mount.clone(), handle(path, *version))
                    .with_fields(private_key_field.clone(), public_key_field.clone());
                Arc::new(LocalKeyCustodian::new(algorithm, Arc::new(source)))
            }
            Self::Filesystem {
                private_key_path,
                public_key_path,
            } => {
                let source = FileKeySource::new(private_key_path.clone(), public_key_path.clone());
                Arc::new(LocalKeyCustodian::new(algorithm, Arc::new(source)))
            }
            Self::VaultTransit {
                vault,
                mount,
                key_name,
                key_version,
            } => {
                require_non_empty("mount", mount)?;
                require_non_empty("key_name", key_name)?;
                if *key_version == Some(0) {
                    return Err(ConfigError::InvalidValue {
                        field: "key_version",
                        reason: "Transit key versions start at 1".to_string(),
                    });
                }
                let client = VaultClient::new(vault)?;
                Arc::new(RemoteSigningCustodian::new(
                    client,
                    mount.clone(),
                    handle(key_name, *key_version),
                    algorithm,
                ))
            }
        };

        info!(kind = self.kind(), custodian = %custodian.describe(), "Key custodian ready");
        Ok(custodian)
    }
}

fn handle(name: &str, version: Option<u32>) -> KeyHandle {
    KeyHandle {
        name: name.to_string(),
        version,
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}
