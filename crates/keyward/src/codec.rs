//! Compact wire form: `base64url(header).base64url(claims).base64url(signature)`
//!
//! Encoding and decoding here are purely structural. Nothing in this module looks at
//! whether a signature is correct or whether the header names an acceptable algorithm.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TOKEN_TYPE;
use crate::algorithm::SigningAlgorithm;
use crate::claims::Claims;
use crate::errors::{MalformedToken, Segment};

/// Token header
///
/// `alg` is kept as free text so a token naming `none` or an unknown algorithm still
/// decodes and can be rejected explicitly by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Algorithm tag
    pub alg: String,
    /// Type tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl TokenHeader {
    /// Header for a token signed with `algorithm`
    #[must_use]
    pub fn new(algorithm: SigningAlgorithm) -> Self {
        Self {
            alg: algorithm.as_str().to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
        }
    }

    fn to_json_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("alg".into(), Value::from(self.alg.as_str()));
        if let Some(typ) = &self.typ {
            map.insert("typ".into(), Value::from(typ.as_str()));
        }
        Value::Object(map)
    }
}

/// Serialized token exchanged with clients
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireToken(String);

impl WireToken {
    /// Borrow the compact string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the compact string
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WireToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WireToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of structurally decoding a wire token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    /// Decoded header
    pub header: TokenHeader,
    /// Decoded, not yet trusted, claims
    pub claims: Claims,
    /// Raw signature bytes
    pub signature: Vec<u8>,
    /// The exact `header.claims` text received, which is what the signature covers
    pub signing_input: String,
}

/// Signing input for a header and claims pair: `base64url(header) + "." + base64url(claims)`
#[must_use]
pub fn signing_input(header: &TokenHeader, claims: &Claims) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_json_value().to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_json_value().to_string());
    format!("{header_b64}.{claims_b64}")
}

/// Assemble a wire token from its parts
#[must_use]
pub fn encode(header: &TokenHeader, claims: &Claims, signature: &[u8]) -> WireToken {
    attach_signature(&signing_input(header, claims), signature)
}

/// Append a signature to an already computed signing input
#[must_use]
pub fn attach_signature(signing_input: &str, signature: &[u8]) -> WireToken {
    WireToken(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Split and decode a wire token
///
/// # Errors
///
/// Returns [`MalformedToken`] when the input does not have exactly three segments, when a
/// segment is not unpadded base64url, or when the header or claims do not parse.
pub fn decode(wire: &str) -> Result<DecodedToken, MalformedToken> {
    let parts: Vec<&str> = wire.split('.').collect();
    let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
        return Err(MalformedToken::SegmentCount { found: parts.len() });
    };

    let header_bytes = decode_segment(header_b64, Segment::Header)?;
    let claims_bytes = decode_segment(claims_b64, Segment::Claims)?;
    let signature = decode_segment(signature_b64, Segment::Signature)?;

    let header: TokenHeader =
        serde_json::from_slice(&header_bytes).map_err(|e| MalformedToken::Header {
            reason: e.to_string(),
        })?;
    let claims: Claims =
        serde_json::from_slice(&claims_bytes).map_err(|e| MalformedToken::Claims {
            reason: e.to_string(),
        })?;

    Ok(DecodedToken {
        header,
        claims,
        signature,
        signing_input: format!("{header_b64}.{claims_b64}"),
    })
}

fn decode_segment(segment: &str, which: Segment) -> Result<Vec<u8>, MalformedToken> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| MalformedToken::Encoding { segment: which })
}
