//! Common test utilities for custody integration tests
//!
//! A wiremock-backed Vault that serves KV v2 secrets and a Transit engine that really signs
//! with an in-test RSA key, so tokens can be checked end to end.

#![allow(dead_code)]

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use keyward::{SigningAlgorithm, TokenConfig, TokenIssuer, TokenVerifier};
use keyward_custody::{SignatureEnvelope, VaultClient, VaultConfig};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, pkcs1v15, pss};
use serde_json::{Value, json};
use sha2::Sha256;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Token the mock Vault accepts
pub const VAULT_TOKEN: &str = "s.test-token";

/// Signing key shared by all tests (RSA keygen is slow)
pub static SIGNING_KEY: Lazy<RsaPrivateKey> =
    Lazy::new(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate signing key"));

/// A second key, standing in for a rotated one
pub static ROTATED_KEY: Lazy<RsaPrivateKey> =
    Lazy::new(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate rotated key"));

/// PKCS#8 private and SPKI public PEM for `key`
pub fn pem_pair(key: &RsaPrivateKey) -> (String, String) {
    let private = key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
    let public = key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    (private, public)
}

/// Issuer and verifier over one custodian
pub fn token_pair(
    issuer_tag: &str,
    algorithm: SigningAlgorithm,
    custodian: Arc<dyn keyward::KeyCustodian>,
) -> (TokenIssuer, TokenVerifier) {
    let config = TokenConfig::new(issuer_tag, algorithm);
    (
        TokenIssuer::new(&config, custodian.clone()).unwrap(),
        TokenVerifier::new(&config, custodian).unwrap(),
    )
}

/// Mock Vault server
pub struct MockVault {
    pub server: MockServer,
}

impl MockVault {
    /// Start an empty mock Vault
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Connection settings pointing at this server
    pub fn config(&self) -> VaultConfig {
        VaultConfig::new(self.server.uri(), VAULT_TOKEN)
    }

    /// Client pointing at this server
    pub fn client(&self) -> VaultClient {
        VaultClient::new(&self.config()).unwrap()
    }

    /// Serve a KV v2 secret at `secret/{path}`
    pub async fn mock_kv_secret(&self, secret_path: &str, data: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/secret/data/{secret_path}")))
            .and(header("X-Vault-Token", VAULT_TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request_id": "00000000-0000-0000-0000-000000000000",
                "data": {
                    "data": data,
                    "metadata": { "version": 1, "destroyed": false }
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve the PEM pair of `key` at `secret/jwt-signing-key`
    pub async fn mock_kv_key(&self, key: &RsaPrivateKey) {
        let (private, public) = pem_pair(key);
        self.mock_kv_secret(
            "jwt-signing-key",
            json!({ "private_key": private, "public_key": public }),
        )
        .await;
    }

    /// Answer every request to `api_path` with `status` and a Vault error body
    pub async fn mock_status(&self, http_method: &str, api_path: &str, status: u16) {
        Mock::given(method(http_method))
            .and(path(api_path))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "errors": ["mock error"] })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a Transit engine that signs and verifies with `key` as `version`
    pub async fn mount_transit(&self, key: &RsaPrivateKey, version: u32) {
        let transit = TransitResponder {
            key: key.clone(),
            version,
        };
        Mock::given(method("POST"))
            .and(path("/v1/transit/sign/jwt-signing-key/sha2-256"))
            .and(header("X-Vault-Token", VAULT_TOKEN))
            .respond_with(transit.clone())
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/transit/verify/jwt-signing-key/sha2-256"))
            .and(header("X-Vault-Token", VAULT_TOKEN))
            .respond_with(transit)
            .mount(&self.server)
            .await;
    }

    /// Transit sign endpoint returning a fixed signature string
    pub async fn mock_transit_signature(&self, signature: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/transit/sign/jwt-signing-key/sha2-256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "signature": signature, "key_version": 1 }
            })))
            .mount(&self.server)
            .await;
    }

    /// Bodies of all requests received so far, parsed as JSON
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}

/// Transit engine backed by a real key
///
/// Behaves like Vault for the parts custody relies on: rejects unknown key versions and
/// unparseable envelopes with 400, answers `valid: false` for wrong signatures.
#[derive(Clone)]
struct TransitResponder {
    key: RsaPrivateKey,
    version: u32,
}

impl TransitResponder {
    fn bad_request(message: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({ "errors": [message] }))
    }

    fn sign(&self, body: &Value, input: &[u8]) -> ResponseTemplate {
        if let Some(requested) = body["key_version"].as_u64()
            && requested != u64::from(self.version)
        {
            return Self::bad_request("requested version does not exist");
        }
        let signature = match body["signature_algorithm"].as_str() {
            Some("pss") => pss::BlindedSigningKey::<Sha256>::new(self.key.clone())
                .sign_with_rng(&mut OsRng, input)
                .to_vec(),
            Some("pkcs1v15") => pkcs1v15::SigningKey::<Sha256>::new(self.key.clone())
                .sign(input)
                .to_vec(),
            _ => return Self::bad_request("unsupported signature algorithm"),
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "signature": SignatureEnvelope::new(self.version, signature).encode(),
                "key_version": self.version
            }
        }))
    }

    fn verify(&self, body: &Value, input: &[u8]) -> ResponseTemplate {
        let Some(Ok(envelope)) = body["signature"].as_str().map(SignatureEnvelope::parse) else {
            return Self::bad_request("invalid signature");
        };
        if envelope.version != self.version {
            return Self::bad_request("key version not found");
        }
        let public = self.key.to_public_key();
        let valid = match body["signature_algorithm"].as_str() {
            Some("pss") => pss::Signature::try_from(envelope.signature.as_slice())
                .is_ok_and(|s| pss::VerifyingKey::<Sha256>::new(public).verify(input, &s).is_ok()),
            Some("pkcs1v15") => pkcs1v15::Signature::try_from(envelope.signature.as_slice())
                .is_ok_and(|s| {
                    pkcs1v15::VerifyingKey::<Sha256>::new(public)
                        .verify(input, &s)
                        .is_ok()
                }),
            _ => return Self::bad_request("unsupported signature algorithm"),
        };
        ResponseTemplate::new(200).set_body_json(json!({ "data": { "valid": valid } }))
    }
}

impl Respond for TransitResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return Self::bad_request("invalid JSON");
        };
        let Some(Ok(input)) = body["input"].as_str().map(|i| STANDARD.decode(i)) else {
            return Self::bad_request("input must be base64");
        };

        if request.url.path().contains("/sign/") {
            self.sign(&body, &input)
        } else {
            self.verify(&body, &input)
        }
    }
}
