//! CLI commands against an in-memory custodian
//!
//! Tests cover:
//! - issue / verify round trip and the printed report
//! - Refusals mapped to exit codes (rejected, subject mismatch, custodian outage)
//! - Password login against a JSON user file
//! - The custodian probe
//! - Listing user profiles
//! - Token lifetimes that cannot be represented

use std::io::Write;
use std::sync::Arc;

use keyward::testing::FakeCustodian;
use keyward::{AccessDenied, LoginError, SigningAlgorithm, TokenConfig};
use keyward_cli::cli::{IssueArgs, VerifyArgs};
use keyward_cli::error::{EXIT_CONFIG, EXIT_REJECTED, EXIT_UNAVAILABLE};
use keyward_cli::{CliError, Context, commands};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn context(custodian: Arc<FakeCustodian>) -> Context {
    let token = TokenConfig::new("local-key-app", SigningAlgorithm::RS256);
    Context::new(&token, custodian, None).unwrap()
}

async fn issue_token(ctx: &Context, subject_id: i64) -> String {
    let args = IssueArgs {
        subject_id,
        name: "alice".to_string(),
        email: "alice@example.com".to_string(),
    };
    let mut out = Vec::new();
    commands::issue(ctx, &args, &mut out).await.unwrap();
    String::from_utf8(out).unwrap().trim().to_string()
}

async fn run_verify(
    ctx: &Context,
    token: &str,
    expect_subject: Option<i64>,
) -> (Result<(), CliError>, Value) {
    let args = VerifyArgs {
        token: token.to_string(),
        expect_subject,
    };
    let mut out = Vec::new();
    let result = commands::verify(ctx, &args, &mut out).await;
    (result, serde_json::from_slice(&out).unwrap())
}

#[tokio::test]
async fn test_issue_then_verify() {
    let ctx = context(Arc::new(FakeCustodian::new(SigningAlgorithm::RS256)));
    let token = issue_token(&ctx, 7).await;
    assert_eq!(token.split('.').count(), 3);

    let (result, report) = run_verify(&ctx, &token, Some(7)).await;
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(report["outcome"], "valid");
    assert_eq!(report["claims"]["user_id"], 7);
    assert_eq!(report["claims"]["iss"], "local-key-app");
}

#[tokio::test]
async fn test_subject_mismatch_is_refused() {
    let ctx = context(Arc::new(FakeCustodian::new(SigningAlgorithm::RS256)));
    let token = issue_token(&ctx, 7).await;

    let (result, report) = run_verify(&ctx, &token, Some(9)).await;
    assert_eq!(report["outcome"], "valid");
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        CliError::Denied(AccessDenied::SubjectMismatch {
            token_subject: 7,
            requested: 9
        })
    ));
    assert_eq!(err.exit_code(), EXIT_REJECTED);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let ctx = context(Arc::new(FakeCustodian::new(SigningAlgorithm::RS256)));

    let (result, report) = run_verify(&ctx, "not-a-token", None).await;
    assert_eq!(report["outcome"], "malformed");
    assert!(report.get("claims").is_none());
    assert_eq!(result.unwrap_err().exit_code(), EXIT_REJECTED);
}

#[tokio::test]
async fn test_foreign_signature_is_rejected() {
    let ctx = context(Arc::new(FakeCustodian::new(SigningAlgorithm::RS256)));
    let foreign = context(Arc::new(FakeCustodian::with_secret(
        SigningAlgorithm::RS256,
        b"another-key",
    )));
    let token = issue_token(&foreign, 7).await;

    let (result, report) = run_verify(&ctx, &token, None).await;
    assert_eq!(report["outcome"], "signature_invalid");
    assert!(matches!(result, Err(CliError::Rejected { .. })));
}

#[tokio::test]
async fn test_outage_is_not_a_rejection() {
    let custodian = Arc::new(FakeCustodian::new(SigningAlgorithm::RS256));
    let ctx = context(custodian.clone());
    let token = issue_token(&ctx, 7).await;
    custodian.set_available(false);

    let (result, report) = run_verify(&ctx, &token, None).await;
    assert_eq!(report["outcome"], "custodian_unavailable");
    assert_eq!(result.unwrap_err().exit_code(), EXIT_UNAVAILABLE);

    let (result, _) = run_verify(&ctx, &token, Some(7)).await;
    assert_eq!(result.unwrap_err().exit_code(), EXIT_UNAVAILABLE);

    let args = IssueArgs {
        subject_id: 7,
        name: "alice".to_string(),
        email: "a@x".to_string(),
    };
    let err = commands::issue(&ctx, &args, &mut Vec::new()).await.unwrap_err();
    assert_eq!(err.exit_code(), EXIT_UNAVAILABLE);
}

fn users_file() -> tempfile::NamedTempFile {
    // sha256("password")
    let users = r#"[
        {
            "id": 12,
            "username": "bob",
            "email": "bob@example.com",
            "password_hash": "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        },
        {
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "password_hash": "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        }
    ]"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(users.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_login() {
    let ctx = context(Arc::new(FakeCustodian::new(SigningAlgorithm::RS256)));
    let users = users_file();

    let mut out = Vec::new();
    commands::login(&ctx, users.path(), "alice", "password", &mut out)
        .await
        .unwrap();
    let token = String::from_utf8(out).unwrap().trim().to_string();

    let (result, report) = run_verify(&ctx, &token, Some(7)).await;
    assert!(result.is_ok());
    assert_eq!(report["claims"]["username"], "alice");
}

#[tokio::test]
async fn test_login_failures_do_not_reveal_which_part_was_wrong() {
    let ctx = context(Arc::new(FakeCustodian::new(SigningAlgorithm::RS256)));
    let users = users_file();

    for (username, password) in [("alice", "wrong"), ("mallory", "password")] {
        let mut out = Vec::new();
        let err = commands::login(&ctx, users.path(), username, password, &mut out)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CliError::Login(LoginError::InvalidCredentials)),
            "{username}: {err:?}"
        );
        assert!(out.is_empty());
    }
}

#[tokio::test]
async fn test_check_probe() {
    let custodian = Arc::new(FakeCustodian::new(SigningAlgorithm::RS256));
    let ctx = context(custodian.clone());

    let mut out = Vec::new();
    commands::check(&ctx, &mut out).await.unwrap();
    let report: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["algorithm"], "RS256");
    assert_eq!(report["signature_bytes"], 32);
    assert!(report.get("vault_token").is_none());
    assert_eq!(custodian.sign_calls(), 1);
    assert_eq!(custodian.verify_calls(), 1);

    custodian.set_available(false);
    let err = commands::check(&ctx, &mut Vec::new()).await.unwrap_err();
    assert!(matches!(err, CliError::Custodian(_)));
    assert_eq!(err.exit_code(), EXIT_UNAVAILABLE);
}

#[tokio::test]
async fn test_users_lists_profiles_without_hashes() {
    let users = users_file();

    let mut out = Vec::new();
    commands::users(users.path(), &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("password_hash"));
    assert!(!text.contains("5e884898"));

    let profiles: Value = serde_json::from_str(&text).unwrap();
    let names: Vec<&str> = profiles
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_users_with_missing_file_is_a_config_problem() {
    let err = commands::users(std::path::Path::new("/nonexistent/users.json"), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Directory(_)), "{err:?}");
    assert_eq!(err.exit_code(), EXIT_CONFIG);
}

#[test]
fn test_unrepresentable_lifetime_is_a_config_problem() {
    let token = TokenConfig::new("local-key-app", SigningAlgorithm::RS256)
        .with_lifetime_secs(9_000_000_000_000);

    let custodian = Arc::new(FakeCustodian::new(SigningAlgorithm::RS256));
    let err = Context::new(&token, custodian.clone(), None).unwrap_err();
    assert!(matches!(err, CliError::Settings(_)), "{err:?}");
    assert_eq!(err.exit_code(), EXIT_CONFIG);
    assert!(!err.suggestions().contains(&"Verify the Vault address and token"));
    assert_eq!(custodian.sign_calls(), 0);
}
