//! Security attack scenario tests
//!
//! Tests cover:
//! - Algorithm confusion (`none`, HMAC, the other RSA padding) rejected before any custodian call
//! - Signature tampering, byte by byte
//! - Claims tampering with the original signature
//! - Horizontal access (valid token for subject 7 used on subject 9)

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeZone, Utc};
use http::StatusCode;
use keyward::codec::{self, TokenHeader};
use keyward::testing::FakeCustodian;
use keyward::{
    AccessDenied, MalformedToken, SigningAlgorithm, TokenConfig, TokenIssuer, TokenVerifier,
    VerificationOutcome, authorize_subject,
};

fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn setup() -> (Arc<FakeCustodian>, TokenIssuer, TokenVerifier) {
    let custodian = Arc::new(FakeCustodian::new(SigningAlgorithm::RS256));
    let config = TokenConfig::new("keyward-kv", SigningAlgorithm::RS256);
    (
        custodian.clone(),
        TokenIssuer::new(&config, custodian.clone()).unwrap(),
        TokenVerifier::new(&config, custodian).unwrap(),
    )
}

/// Test: Algorithm confusion - header swapped to another algorithm
///
/// Attack: Attacker rewrites `alg` to `none`, an HMAC scheme or the sibling RSA padding
/// Defense: Header algorithm must equal the deployment's single algorithm, checked before
/// the custodian is asked anything
#[tokio::test]
async fn test_algorithm_confusion_rejected_before_custodian() {
    let (custodian, issuer, verifier) = setup();
    let token = issuer.issue(7, "alice", "a@x", now()).await.unwrap();
    let decoded = codec::decode(token.as_str()).unwrap();

    for alg in ["none", "None", "HS256", "PS256", "rs256", ""] {
        // GIVEN: The genuine claims and signature under a rewritten header
        let header = TokenHeader {
            alg: alg.to_string(),
            typ: Some("JWT".to_string()),
        };
        let forged = codec::encode(&header, &decoded.claims, &decoded.signature);

        // WHEN: The forged token is verified
        let outcome = verifier.verify(forged.as_str(), now()).await;

        // THEN: It is malformed, and the custodian was never called
        assert!(
            matches!(
                outcome,
                VerificationOutcome::Malformed(MalformedToken::AlgorithmRejected { .. })
            ),
            "alg {alg:?} gave {outcome:?}"
        );
    }
    assert_eq!(custodian.verify_calls(), 0);
}

/// Test: Classic unsigned token with an empty signature segment
#[tokio::test]
async fn test_none_algorithm_without_signature() {
    let (custodian, _, verifier) = setup();
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(
        r#"{"user_id":1,"username":"admin","email":"a@x","iat":1700000000,"exp":1800000000,"iss":"keyward-kv"}"#,
    );
    let wire = format!("{header}.{claims}.");

    let outcome = verifier.verify(&wire, now()).await;
    assert!(matches!(outcome, VerificationOutcome::Malformed(_)));
    assert_eq!(custodian.verify_calls(), 0);
}

/// Test: Any single-byte change to the signature is detected
#[tokio::test]
async fn test_every_signature_byte_is_checked() {
    let (_, issuer, verifier) = setup();
    let token = issuer.issue(7, "alice", "a@x", now()).await.unwrap();
    let decoded = codec::decode(token.as_str()).unwrap();

    for index in 0..decoded.signature.len() {
        for mask in [0x01_u8, 0x80, 0xff] {
            let mut signature = decoded.signature.clone();
            signature[index] ^= mask;
            let tampered = codec::attach_signature(&decoded.signing_input, &signature);

            assert_eq!(
                verifier.verify(tampered.as_str(), now()).await,
                VerificationOutcome::SignatureInvalid,
                "byte {index} mask {mask:#04x}"
            );
        }
    }
}

/// Test: Changing a character of the signature text never yields a valid token
#[tokio::test]
async fn test_signature_text_mutation_never_valid() {
    let (_, issuer, verifier) = setup();
    let token = issuer.issue(7, "alice", "a@x", now()).await.unwrap();
    let (input, signature_b64) = token.as_str().rsplit_once('.').unwrap();

    for index in 0..signature_b64.len() {
        let mut chars: Vec<char> = signature_b64.chars().collect();
        chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
        let mutated = format!("{input}.{}", chars.into_iter().collect::<String>());

        let outcome = verifier.verify(&mutated, now()).await;
        assert!(!outcome.is_valid(), "position {index} accepted");
    }
}

/// Test: Privilege escalation by editing claims and keeping the signature
#[tokio::test]
async fn test_claims_tampering_detected() {
    let (_, issuer, verifier) = setup();
    let token = issuer.issue(7, "alice", "a@x", now()).await.unwrap();
    let decoded = codec::decode(token.as_str()).unwrap();

    let mut claims = decoded.claims.clone();
    claims.subject_id = 1;
    claims.subject_name = "admin".to_string();
    let forged = codec::encode(&decoded.header, &claims, &decoded.signature);

    assert_eq!(
        verifier.verify(forged.as_str(), now()).await,
        VerificationOutcome::SignatureInvalid
    );
}

/// Test: Horizontal access with a genuine token
///
/// Attack: User 7 asks for user 9's resource with their own valid token
/// Defense: The caller-side subject check rejects it even though verification succeeds
#[tokio::test]
async fn test_valid_token_for_other_subject_forbidden() {
    let (_, issuer, verifier) = setup();

    // GIVEN: A valid token for subject 7
    let token = issuer.issue(7, "alice", "a@x", now()).await.unwrap();
    let outcome = verifier.verify(token.as_str(), now()).await;
    assert!(outcome.is_valid());

    // WHEN: It is presented for subject 9
    let err = authorize_subject(outcome.clone(), 9).unwrap_err();

    // THEN: Authorization fails with 403
    assert_eq!(
        err,
        AccessDenied::SubjectMismatch {
            token_subject: 7,
            requested: 9
        }
    );
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    // AND: The same outcome is fine for subject 7
    assert_eq!(authorize_subject(outcome, 7).unwrap().subject_id, 7);
}
