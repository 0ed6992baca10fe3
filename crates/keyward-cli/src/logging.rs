//! Tracing subscriber setup
//!
//! Logs always go to stderr so stdout carries only command output (tokens, reports).

use tracing_subscriber::{
    Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{CliError, CliResult};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the filter: `-v` forces debug, otherwise `RUST_LOG`, otherwise [`DEFAULT_LOG_LEVEL`]
pub fn env_filter(verbose: bool) -> CliResult<EnvFilter> {
    let filter = if verbose {
        EnvFilter::try_new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
    };
    filter.map_err(|e| CliError::Logging {
        reason: format!("Invalid log level: {e}"),
    })
}

/// Install the global subscriber
pub fn init(verbose: bool, json_logs: bool) -> CliResult<()> {
    let env_filter = env_filter(verbose)?;

    let result = if json_logs {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|e| CliError::Logging {
        reason: e.to_string(),
    })
}
