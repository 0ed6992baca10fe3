//! # Keyward CLI
//!
//! Command-line front end for `keyward`: issue, verify and log in with tokens signed by the
//! configured key custodian, and check that the custodian is reachable.
//!
//! ## Usage
//!
//! ```bash
//! # Issue a token
//! keyward --config keyward.toml issue --subject-id 7 --name alice --email alice@example.com
//!
//! # Verify it, requiring subject 7 (exit code 0 only if accepted)
//! keyward verify "$TOKEN" --expect-subject 7
//!
//! # Password login against a JSON user file
//! KEYWARD_PASSWORD=... keyward login --users users.json --username alice
//!
//! # List user profiles (no custodian or configuration needed)
//! keyward users --users users.json
//!
//! # Probe the custodian
//! keyward check
//! ```
//!
//! Exit codes: 0 success, 1 refused, 2 configuration problem, 3 custodian unavailable,
//! 4 local I/O failure.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod settings;

use anyhow::Context as _;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

pub use cli::{Cli, Commands};
pub use commands::Context;
pub use error::{CliError, CliResult};
pub use settings::{Overrides, Settings};

/// Environment variable `login` reads the password from
pub const PASSWORD_ENV: &str = "KEYWARD_PASSWORD";

/// Parse arguments and run the selected command
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs)?;

    let mut stdout = std::io::stdout();
    if let Commands::Users(args) = &cli.command {
        commands::users(&args.users, &mut stdout)
            .await
            .with_context(|| format!("listing users in {}", args.users.display()))?;
        return Ok(());
    }

    let overrides = Overrides {
        issuer: cli.issuer.clone(),
        algorithm: cli.algorithm,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides).with_context(|| {
        match &cli.config {
            Some(path) => format!("loading configuration from {}", path.display()),
            None => "loading configuration".to_string(),
        }
    })?;
    let ctx = Context::from_settings(&settings)
        .with_context(|| format!("building {} custodian", settings.custody.kind()))?;

    match cli.command {
        Commands::Issue(args) => commands::issue(&ctx, &args, &mut stdout).await?,
        Commands::Verify(mut args) => {
            if args.token == "-" {
                args.token = read_stdin_line().await?;
            }
            commands::verify(&ctx, &args, &mut stdout).await?;
        }
        Commands::Login(args) => {
            let password = match std::env::var(PASSWORD_ENV) {
                Ok(password) => password,
                Err(_) => read_stdin_line().await?,
            };
            commands::login(&ctx, &args.users, &args.username, &password, &mut stdout)
                .await
                .with_context(|| format!("logging in as {}", args.username))?;
        }
        // Handled before configuration is loaded
        Commands::Users(_) => {}
        Commands::Check => commands::check(&ctx, &mut stdout).await?,
    }
    Ok(())
}

/// Exit code for an error returned by [`run`]
#[must_use]
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<CliError>()
        .map_or(error::EXIT_CONFIG, CliError::exit_code)
}

/// Hints for an error returned by [`run`]
#[must_use]
pub fn suggestions(error: &anyhow::Error) -> Vec<&'static str> {
    error
        .downcast_ref::<CliError>()
        .map(CliError::suggestions)
        .unwrap_or_default()
}

async fn read_stdin_line() -> CliResult<String> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_through_context() {
        let err = anyhow::Error::new(CliError::Rejected {
            outcome: "expired".to_string(),
        })
        .context("verifying token");
        assert_eq!(exit_code(&err), error::EXIT_REJECTED);

        let err = anyhow::Error::new(CliError::Undecided {
            reason: "sealed".to_string(),
        })
        .context("verifying token");
        assert_eq!(exit_code(&err), error::EXIT_UNAVAILABLE);
        assert!(!suggestions(&err).is_empty());
    }
}
