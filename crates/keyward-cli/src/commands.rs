//! Command implementations
//!
//! Each command writes its result to `out` (stdout in the binary) and reports refusal
//! through [`CliError`] so the binary can pick the exit code.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use keyward::{
    Claims, InMemoryUserDirectory, KeyCustodian, Sha256PasswordHasher, SessionService,
    TokenConfig, TokenIssuer, TokenVerifier, UserDirectory, VerificationOutcome,
    authorize_subject,
};
use keyward_custody::{VaultClient, VaultConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{IssueArgs, VerifyArgs};
use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Message signed by `check`
const PROBE_PREFIX: &str = "keyward-probe";

/// Custodian, issuer and verifier built from one configuration
#[derive(Debug, Clone)]
pub struct Context {
    custodian: Arc<dyn KeyCustodian>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    vault: Option<VaultConfig>,
}

impl Context {
    /// Build everything from loaded settings
    pub fn from_settings(settings: &Settings) -> CliResult<Self> {
        let token = settings.token_config();
        let custodian = settings.custody.build(token.algorithm)?;
        Self::new(&token, custodian, settings.custody.vault().cloned())
    }

    /// Build around an existing custodian
    ///
    /// `vault` is the connection `check` uses to report on the Vault token, if any.
    pub fn new(
        token: &TokenConfig,
        custodian: Arc<dyn KeyCustodian>,
        vault: Option<VaultConfig>,
    ) -> CliResult<Self> {
        Ok(Self {
            issuer: TokenIssuer::new(token, custodian.clone())?,
            verifier: TokenVerifier::new(token, custodian.clone())?,
            custodian,
            vault,
        })
    }
}

/// What `verify` prints
#[derive(Debug, Serialize)]
pub struct VerifyReport<'a> {
    /// Outcome kind (`valid`, `expired`, `signature_invalid`, ...)
    pub outcome: &'static str,
    /// Human-readable outcome
    pub detail: String,
    /// Decoded claims, only for valid or expired tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<&'a Claims>,
}

/// What `check` prints
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Custodian description
    pub custodian: String,
    /// Configured algorithm
    pub algorithm: String,
    /// Signature length of the probe in bytes
    pub signature_bytes: usize,
    /// Vault token identity, for Vault-backed custody
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_token: Option<VaultTokenReport>,
}

/// Vault token details reported by `check`
#[derive(Debug, Serialize)]
pub struct VaultTokenReport {
    /// Display name
    pub display_name: Option<String>,
    /// Attached policies
    pub policies: Vec<String>,
    /// Remaining time to live in seconds
    pub ttl: u64,
}

/// Issue a token and print it
pub async fn issue(ctx: &Context, args: &IssueArgs, out: &mut dyn Write) -> CliResult<()> {
    let token = ctx
        .issuer
        .issue(args.subject_id, &args.name, &args.email, Utc::now())
        .await?;
    writeln!(out, "{token}")?;
    Ok(())
}

/// Verify a token and print the outcome
///
/// Succeeds only for a valid token that, when `expect_subject` is set, asserts that subject.
pub async fn verify(ctx: &Context, args: &VerifyArgs, out: &mut dyn Write) -> CliResult<()> {
    let outcome = ctx.verifier.verify(args.token.trim(), Utc::now()).await;

    let report = VerifyReport {
        outcome: outcome.kind(),
        detail: outcome.to_string(),
        claims: outcome.claims(),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;

    if let Some(requested) = args.expect_subject {
        authorize_subject(outcome, requested)?;
        return Ok(());
    }

    match outcome {
        VerificationOutcome::Valid(_) => Ok(()),
        VerificationOutcome::CustodianUnavailable(e) => Err(CliError::Undecided {
            reason: e.to_string(),
        }),
        other => Err(CliError::Rejected {
            outcome: other.to_string(),
        }),
    }
}

/// Check credentials against a user file and print the issued token
pub async fn login(
    ctx: &Context,
    users: &Path,
    username: &str,
    password: &str,
    out: &mut dyn Write,
) -> CliResult<()> {
    let directory = InMemoryUserDirectory::from_json_file(users).await?;
    let service = SessionService::new(
        Arc::new(directory),
        Arc::new(Sha256PasswordHasher),
        ctx.issuer.clone(),
        ctx.verifier.clone(),
    );

    let session = service.login(username, password, Utc::now()).await?;
    writeln!(out, "{}", session.token)?;
    Ok(())
}

/// Print every profile in a user file, ordered by id
///
/// Needs no custodian; credential hashes are never printed.
pub async fn users(users: &Path, out: &mut dyn Write) -> CliResult<()> {
    let directory = InMemoryUserDirectory::from_json_file(users).await?;
    let profiles = directory.list_profiles().await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&profiles)?)?;
    Ok(())
}

/// Sign and verify a probe message, and look up the Vault token when custody uses Vault
pub async fn check(ctx: &Context, out: &mut dyn Write) -> CliResult<()> {
    let probe = format!("{PROBE_PREFIX}:{}", Utc::now().timestamp());

    let signature = ctx.custodian.sign(probe.as_bytes()).await?;
    if !ctx.custodian.verify(probe.as_bytes(), &signature).await? {
        warn!(custodian = %ctx.custodian.describe(), "Probe signature did not verify");
        return Err(CliError::CheckFailed {
            reason: "the custodian rejected its own signature".to_string(),
        });
    }

    let vault_token = match &ctx.vault {
        Some(vault) => {
            let lookup = VaultClient::new(vault)?.lookup_self().await?;
            Some(VaultTokenReport {
                display_name: lookup.display_name,
                policies: lookup.policies,
                ttl: lookup.ttl,
            })
        }
        None => None,
    };

    let report = CheckReport {
        custodian: ctx.custodian.describe(),
        algorithm: ctx.custodian.algorithm().to_string(),
        signature_bytes: signature.len(),
        vault_token,
    };
    info!(custodian = %report.custodian, "Custodian check passed");
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
