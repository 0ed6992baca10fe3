//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keyward::SigningAlgorithm;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "keyward",
    version,
    about = "Issue and verify identity tokens signed by an external key custodian",
    long_about = "Keyward issues and verifies signed identity tokens whose signing key is held by \
                  Vault (KV v2 or Transit) or by PEM files on disk.\n\n\
                  Configuration is read from a TOML file (--config), then KEYWARD_* environment \
                  variables (KEYWARD_SECTION__FIELD), then the flags below.\n\n\
                  Passwords are never accepted as arguments: `login` reads KEYWARD_PASSWORD or \
                  one line from stdin."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(long, short = 'c', global = true, env = "KEYWARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured issuer tag
    #[arg(long, global = true)]
    pub issuer: Option<String>,

    /// Override the configured signing algorithm (RS256 or PS256)
    #[arg(long, global = true)]
    pub algorithm: Option<SigningAlgorithm>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue a token for a subject and print it
    Issue(IssueArgs),

    /// Verify a token and print the outcome
    Verify(VerifyArgs),

    /// Check a username and password against a user file and print a token
    Login(LoginArgs),

    /// List the profiles in a user file, without credential hashes
    Users(UsersArgs),

    /// Sign and verify a probe message with the configured custodian
    Check,
}

/// Arguments for `issue`
#[derive(Args, Debug, Clone)]
pub struct IssueArgs {
    /// Subject identifier
    #[arg(long, allow_negative_numbers = true)]
    pub subject_id: i64,

    /// Subject username
    #[arg(long)]
    pub name: String,

    /// Subject email
    #[arg(long)]
    pub email: String,
}

/// Arguments for `verify`
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Wire token, or `-` to read it from stdin
    pub token: String,

    /// Require the token to assert this subject
    #[arg(long, allow_negative_numbers = true)]
    pub expect_subject: Option<i64>,
}

/// Arguments for `login`
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// JSON file with an array of user records
    #[arg(long)]
    pub users: PathBuf,

    /// Login name
    #[arg(long)]
    pub username: String,
}

/// Arguments for `users`
#[derive(Args, Debug, Clone)]
pub struct UsersArgs {
    /// JSON file with an array of user records
    #[arg(long)]
    pub users: PathBuf,
}
