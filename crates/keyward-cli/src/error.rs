//! Error types for CLI operations

use keyward::{AccessDenied, CustodianError, DirectoryError, IssueError, LoginError};
use thiserror::Error;

/// Exit code for a token or credential that was checked and refused
pub const EXIT_REJECTED: i32 = 1;
/// Exit code for unusable configuration or arguments
pub const EXIT_CONFIG: i32 = 2;
/// Exit code when the custodian could not be reached or could not decide
pub const EXIT_UNAVAILABLE: i32 = 3;
/// Exit code for local I/O failures (stdin, stdout, output encoding)
pub const EXIT_IO: i32 = 4;

fn issue_exit_code(error: &IssueError) -> i32 {
    match error {
        IssueError::SigningFailed { .. } => EXIT_UNAVAILABLE,
        IssueError::InvalidLifetime { .. } => EXIT_CONFIG,
    }
}

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but is not usable
    #[error("Invalid configuration: {0}")]
    Settings(#[from] keyward::ConfigError),

    /// The token was verified and not accepted
    #[error("Token not accepted: {outcome}")]
    Rejected {
        /// Verification outcome
        outcome: String,
    },

    /// The token could not be verified
    #[error("Token could not be verified: {reason}")]
    Undecided {
        /// Custodian failure
        reason: String,
    },

    /// The mandatory subject check refused the token
    #[error("{0}")]
    Denied(#[from] AccessDenied),

    /// Token issuance failed
    #[error("{0}")]
    Issue(#[from] IssueError),

    /// Login failed
    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    /// The user directory could not be loaded
    #[error("{0}")]
    Directory(#[from] DirectoryError),

    /// A direct custodian call failed
    #[error("{0}")]
    Custodian(#[from] CustodianError),

    /// The custodian answered but the probe did not round-trip
    #[error("Custodian check failed: {reason}")]
    CheckFailed {
        /// What went wrong
        reason: String,
    },

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {reason}")]
    Logging {
        /// Subscriber error
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Rejected { .. } | Self::CheckFailed { .. } => EXIT_REJECTED,
            Self::Denied(AccessDenied::ServiceUnavailable { .. }) => EXIT_UNAVAILABLE,
            Self::Denied(_) => EXIT_REJECTED,
            Self::Login(LoginError::InvalidCredentials | LoginError::MissingCredentials) => {
                EXIT_REJECTED
            }
            Self::Login(LoginError::Issue(e)) | Self::Issue(e) => issue_exit_code(e),
            Self::Undecided { .. } | Self::Custodian(_) => EXIT_UNAVAILABLE,
            Self::Login(LoginError::Directory(_)) | Self::Directory(_) => EXIT_CONFIG,
            Self::Config(_) | Self::Settings(_) | Self::Logging { .. } => EXIT_CONFIG,
            Self::Io(_) | Self::Json(_) => EXIT_IO,
        }
    }

    /// User-facing hints for resolving the error
    #[must_use]
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Config(_) => vec![
                "Pass a TOML file with --config or set KEYWARD_CONFIG",
                "Environment overrides use KEYWARD_SECTION__FIELD, e.g. KEYWARD_TOKEN__ALGORITHM",
            ],
            Self::Settings(_) => vec!["Check the [token] and [custody] sections of the config"],
            Self::Issue(IssueError::InvalidLifetime { .. })
            | Self::Login(LoginError::Issue(IssueError::InvalidLifetime { .. })) => {
                vec!["Lower token.lifetime_secs"]
            }
            Self::Issue(IssueError::SigningFailed { .. })
            | Self::Login(LoginError::Issue(IssueError::SigningFailed { .. }))
            | Self::Undecided { .. }
            | Self::Custodian(_) => vec![
                "Run `keyward check` to test the custodian",
                "Verify the Vault address and token",
            ],
            Self::Denied(AccessDenied::ServiceUnavailable { .. }) => {
                vec!["Run `keyward check` to test the custodian"]
            }
            _ => Vec::new(),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
