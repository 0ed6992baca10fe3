//! # Keyward Custody
//!
//! [`KeyCustodian`](keyward::KeyCustodian) implementations.
//!
//! ## Strategies
//!
//! - **Fetch and sign locally** ([`LocalKeyCustodian`]): PEM key material is read from a
//!   [`KeyMaterialSource`] on every call, either a Vault KV v2 secret ([`VaultKvSource`]) or
//!   two files ([`FileKeySource`]), and RSA signing happens in-process.
//! - **Delegate** ([`RemoteSigningCustodian`]): Vault Transit signs and verifies. The
//!   application never sees the private key; only signatures cross the wire, wrapped in a
//!   [`SignatureEnvelope`].
//!
//! [`CustodyConfig`] selects one of them from configuration.
//!
//! ## Example
//!
//! ```rust,no_run
//! use keyward::{SigningAlgorithm, TokenConfig, TokenIssuer};
//! use keyward_custody::CustodyConfig;
//!
//! # tokio_test::block_on(async {
//! let custody: CustodyConfig = serde_json::from_str(r#"{
//!     "kind": "vault_transit",
//!     "vault": { "addr": "https://vault.internal:8200", "token": "s.xxxxx" },
//!     "key_name": "jwt-signing-key"
//! }"#)?;
//!
//! let custodian = custody.build(SigningAlgorithm::PS256)?;
//! let config = TokenConfig::new(custody.default_issuer(), SigningAlgorithm::PS256);
//! let issuer = TokenIssuer::new(&config, custodian)?;
//! let _token = issuer.issue(7, "alice", "alice@example.com", chrono::Utc::now()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod config;
pub mod envelope;
pub mod local;
pub mod remote;
pub mod source;
pub mod vault;

pub use config::CustodyConfig;
pub use envelope::{EnvelopeError, SignatureEnvelope};
pub use local::LocalKeyCustodian;
pub use remote::RemoteSigningCustodian;
pub use source::{FileKeySource, KeyMaterialSource, VaultKvSource};
pub use vault::{KvSecret, TokenLookup, VaultClient, VaultConfig};
