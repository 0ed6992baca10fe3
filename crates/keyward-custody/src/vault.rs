//! Minimal Vault HTTP client
//!
//! Covers the four calls custody needs: KV v2 read, Transit sign, Transit verify and a token
//! self-lookup. Every call is bounded by the configured timeout and never follows redirects.
//!
//! # Security Considerations
//!
//! - HTTPS is required unless the address is a loopback host (local dev servers)
//! - The token is held as a [`SecretString`] and only exposed when building a request header
//! - Request paths are logged, tokens and payloads are not

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use keyward::{ConfigError, CustodianError};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Header carrying the Vault token
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Header selecting a Vault Enterprise namespace
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Connection settings for a Vault server
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Base address, e.g. `https://vault.internal:8200`
    pub addr: String,
    /// Client token
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: SecretString,
    /// Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl VaultConfig {
    /// Settings with the default timeout and no namespace
    pub fn new(addr: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token: SecretString::new(token.into()),
            namespace: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(SecretString::new(s))
}

/// Secret fields of one KV v2 entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvSecret {
    /// Field name to value
    pub data: HashMap<String, serde_json::Value>,
    /// Version that was read, if Vault reported it
    pub version: Option<u32>,
}

/// Result of a token self-lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenLookup {
    /// Display name of the token
    #[serde(default)]
    pub display_name: Option<String>,
    /// Attached policies
    #[serde(default)]
    pub policies: Vec<String>,
    /// Remaining lifetime in seconds, 0 for non-expiring tokens
    #[serde(default)]
    pub ttl: u64,
}

/// Body of a Transit sign call
#[derive(Debug, Clone, Serialize)]
pub struct TransitSignRequest {
    /// Standard base64 of the bytes to sign
    pub input: String,
    /// `pkcs1v15` or `pss`
    pub signature_algorithm: &'static str,
    /// Salt length for PSS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_length: Option<&'static str>,
    /// Key version to sign with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_version: Option<u32>,
}

/// Body of a Transit verify call
#[derive(Debug, Clone, Serialize)]
pub struct TransitVerifyRequest {
    /// Standard base64 of the signed bytes
    pub input: String,
    /// Signature envelope text
    pub signature: String,
    /// `pkcs1v15` or `pss`
    pub signature_algorithm: &'static str,
    /// Salt length for PSS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_length: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct DataWrapper<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct KvData {
    data: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    metadata: Option<KvMetadata>,
}

#[derive(Debug, Deserialize)]
struct KvMetadata {
    #[serde(default)]
    version: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SignData {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    valid: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault client bound to one address and token
#[derive(Debug, Clone)]
pub struct VaultClient {
    base: Url,
    token: SecretString,
    namespace: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl VaultClient {
    /// Build a client
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the address does not parse, is not HTTPS
    /// for a non-loopback host, the timeout is zero, or the HTTP client cannot be built.
    pub fn new(config: &VaultConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.addr).map_err(|e| ConfigError::InvalidValue {
            field: "vault.addr",
            reason: e.to_string(),
        })?;
        validate_base(&base)?;

        if config.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vault.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        let timeout = Duration::from_secs(config.timeout_secs);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "vault",
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base,
            token: config.token.clone(),
            namespace: config.namespace.clone(),
            timeout,
            http,
        })
    }

    /// Base address this client talks to
    #[must_use]
    pub fn addr(&self) -> &Url {
        &self.base
    }

    /// Read a KV v2 secret
    ///
    /// `mount` is the KV engine mount (e.g. `secret`), `path` the logical secret path.
    ///
    /// # Errors
    ///
    /// [`CustodianError::SecretNotFound`] for a missing or deleted secret, otherwise see the
    /// module docs for the status mapping.
    pub async fn kv_read(
        &self,
        mount: &str,
        path: &str,
        version: Option<u32>,
    ) -> Result<KvSecret, CustodianError> {
        let logical = format!("{mount}/{path}");
        let mut url = self.endpoint(&format!("{mount}/data/{path}"))?;
        if let Some(version) = version {
            url.query_pairs_mut()
                .append_pair("version", &version.to_string());
        }

        let body: DataWrapper<KvData> = self.send(Method::GET, url, &logical, None::<&()>).await?;
        let data = body
            .data
            .data
            .ok_or(CustodianError::SecretNotFound { path: logical })?;

        Ok(KvSecret {
            data,
            version: body.data.metadata.and_then(|m| m.version),
        })
    }

    /// Sign with a Transit key, returning the envelope text
    ///
    /// # Errors
    ///
    /// See the module docs for the status mapping.
    pub async fn transit_sign(
        &self,
        mount: &str,
        key: &str,
        request: &TransitSignRequest,
    ) -> Result<String, CustodianError> {
        let logical = format!("{mount}/keys/{key}");
        let url = self.endpoint(&format!("{mount}/sign/{key}/sha2-256"))?;
        let body: DataWrapper<SignData> =
            self.send(Method::POST, url, &logical, Some(request)).await?;
        Ok(body.data.signature)
    }

    /// Verify with a Transit key
    ///
    /// # Errors
    ///
    /// See the module docs for the status mapping. A signature Vault cannot parse comes
    /// back as a 400 and maps to [`CustodianError::Rejected`], not to `Ok(false)`.
    pub async fn transit_verify(
        &self,
        mount: &str,
        key: &str,
        request: &TransitVerifyRequest,
    ) -> Result<bool, CustodianError> {
        let logical = format!("{mount}/keys/{key}");
        let url = self.endpoint(&format!("{mount}/verify/{key}/sha2-256"))?;
        let body: DataWrapper<VerifyData> =
            self.send(Method::POST, url, &logical, Some(request)).await?;
        Ok(body.data.valid)
    }

    /// Look up the client's own token
    ///
    /// # Errors
    ///
    /// [`CustodianError::Unauthenticated`] if the token is invalid or expired.
    pub async fn lookup_self(&self) -> Result<TokenLookup, CustodianError> {
        let url = self.endpoint("auth/token/lookup-self")?;
        let body: DataWrapper<TokenLookup> = self
            .send(Method::GET, url, "auth/token/lookup-self", None::<&()>)
            .await?;
        Ok(body.data)
    }

    fn endpoint(&self, api_path: &str) -> Result<Url, CustodianError> {
        if api_path
            .split('/')
            .any(|s| s.is_empty() || s == "." || s == "..")
            || api_path.contains(['?', '#'])
        {
            return Err(CustodianError::InvalidKeyMaterial {
                reason: format!("invalid Vault path '{api_path}'"),
            });
        }
        let prefix = self.base.path().trim_end_matches('/');
        let mut url = self.base.clone();
        url.set_path(&format!("{prefix}/v1/{api_path}"));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(TOKEN_HEADER, self.token.expose_secret().as_str());
        match &self.namespace {
            Some(namespace) => builder.header(NAMESPACE_HEADER, namespace.as_str()),
            None => builder,
        }
    }

    async fn send<B, T>(
        &self,
        method: Method,
        url: Url,
        logical: &str,
        body: Option<&B>,
    ) -> Result<T, CustodianError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = %method, path = %url.path(), "Vault request");

        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), path = logical, "Vault request failed");
            return Err(status_error(status, logical, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| CustodianError::MalformedResponse {
            reason: format!("{logical}: {e}"),
        })
    }

    fn transport_error(&self, error: &reqwest::Error) -> CustodianError {
        if error.is_timeout() {
            CustodianError::Timeout {
                timeout: self.timeout,
            }
        } else {
            CustodianError::Unreachable {
                reason: error.to_string(),
            }
        }
    }
}

fn validate_base(base: &Url) -> Result<(), ConfigError> {
    let loopback = match base.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => {
            return Err(ConfigError::InvalidValue {
                field: "vault.addr",
                reason: "address has no host".to_string(),
            });
        }
    };
    match base.scheme() {
        "https" => Ok(()),
        "http" if loopback => Ok(()),
        scheme => Err(ConfigError::InvalidValue {
            field: "vault.addr",
            reason: format!("scheme '{scheme}' not allowed, use https (http only for loopback)"),
        }),
    }
}

fn status_error(status: StatusCode, logical: &str, body: &[u8]) -> CustodianError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CustodianError::Unauthenticated,
        StatusCode::NOT_FOUND => CustodianError::SecretNotFound {
            path: logical.to_string(),
        },
        _ => {
            let errors = serde_json::from_slice::<ErrorBody>(body)
                .unwrap_or_default()
                .errors;
            CustodianError::Rejected {
                status: status.as_u16(),
                reason: if errors.is_empty() {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                } else {
                    errors.join("; ")
                },
            }
        }
    }
}
