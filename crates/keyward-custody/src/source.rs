//! Where local custodians get their PEM key material
//!
//! Sources are read on every call. Nothing is cached here, so a rotated key is picked up by
//! the next sign or verify.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keyward::{CustodianError, KeyHandle};
use tracing::debug;
use zeroize::Zeroizing;

use crate::vault::VaultClient;

/// Default KV v2 mount
pub const DEFAULT_KV_MOUNT: &str = "secret";

/// Default logical path of the signing key secret
pub const DEFAULT_KV_PATH: &str = "jwt-signing-key";

/// Default field holding the private key PEM
pub const DEFAULT_PRIVATE_KEY_FIELD: &str = "private_key";

/// Default field holding the public key PEM
pub const DEFAULT_PUBLIC_KEY_FIELD: &str = "public_key";

/// A store of PEM-encoded key material
#[async_trait]
pub trait KeyMaterialSource: Send + Sync + fmt::Debug {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Fetch the private key PEM
    async fn private_key_pem(&self) -> Result<Zeroizing<String>, CustodianError>;

    /// Fetch the public key PEM
    async fn public_key_pem(&self) -> Result<String, CustodianError>;
}

/// Key material stored as two fields of a Vault KV v2 secret
#[derive(Debug, Clone)]
pub struct VaultKvSource {
    client: VaultClient,
    mount: String,
    handle: KeyHandle,
    private_key_field: String,
    public_key_field: String,
}

impl VaultKvSource {
    /// Source reading `handle.name` under `mount` with the default field names
    pub fn new(client: VaultClient, mount: impl Into<String>, handle: KeyHandle) -> Self {
        Self {
            client,
            mount: mount.into(),
            handle,
            private_key_field: DEFAULT_PRIVATE_KEY_FIELD.to_string(),
            public_key_field: DEFAULT_PUBLIC_KEY_FIELD.to_string(),
        }
    }

    /// Use different field names
    #[must_use]
    pub fn with_fields(
        mut self,
        private_key_field: impl Into<String>,
        public_key_field: impl Into<String>,
    ) -> Self {
        self.private_key_field = private_key_field.into();
        self.public_key_field = public_key_field.into();
        self
    }

    async fn read_field(&self, field: &str) -> Result<Zeroizing<String>, CustodianError> {
        let secret = self
            .client
            .kv_read(&self.mount, &self.handle.name, self.handle.version)
            .await?;
        let path = format!("{}/{}", self.mount, self.handle.name);

        debug!(path = %path, version = ?secret.version, field, "Read key material from Vault KV");

        match secret.data.get(field) {
            Some(serde_json::Value::String(pem)) => Ok(Zeroizing::new(pem.clone())),
            Some(_) => Err(CustodianError::InvalidKeyMaterial {
                reason: format!("field '{field}' of '{path}' is not a string"),
            }),
            None => Err(CustodianError::MissingField {
                path,
                field: field.to_string(),
            }),
        }
    }
}

#[async_trait]
impl KeyMaterialSource for VaultKvSource {
    fn describe(&self) -> String {
        format!("vault-kv({}/{})", self.mount, self.handle)
    }

    async fn private_key_pem(&self) -> Result<Zeroizing<String>, CustodianError> {
        self.read_field(&self.private_key_field).await
    }

    async fn public_key_pem(&self) -> Result<String, CustodianError> {
        let pem = self.read_field(&self.public_key_field).await?;
        Ok(pem.as_str().to_string())
    }
}

/// Key material stored as two PEM files
#[derive(Debug, Clone)]
pub struct FileKeySource {
    private_key_path: PathBuf,
    public_key_path: PathBuf,
}

impl FileKeySource {
    /// Source reading the given files
    pub fn new(private_key_path: impl Into<PathBuf>, public_key_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
            public_key_path: public_key_path.into(),
        }
    }
}

async fn read_pem(path: &Path) -> Result<Zeroizing<String>, CustodianError> {
    match tokio::fs::read_to_string(path).await {
        Ok(pem) => Ok(Zeroizing::new(pem)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(CustodianError::SecretNotFound {
            path: path.display().to_string(),
        }),
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(CustodianError::InvalidKeyMaterial {
            reason: format!("{} is not UTF-8 PEM", path.display()),
        }),
        Err(e) => Err(CustodianError::Unreachable {
            reason: format!("{}: {e}", path.display()),
        }),
    }
}

#[async_trait]
impl KeyMaterialSource for FileKeySource {
    fn describe(&self) -> String {
        format!("file({})", self.private_key_path.display())
    }

    async fn private_key_pem(&self) -> Result<Zeroizing<String>, CustodianError> {
        read_pem(&self.private_key_path).await
    }

    async fn public_key_pem(&self) -> Result<String, CustodianError> {
        let pem = read_pem(&self.public_key_path).await?;
        Ok(pem.as_str().to_string())
    }
}
