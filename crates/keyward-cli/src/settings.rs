//! Layered configuration
//!
//! Sources, later ones winning:
//! 1. `keyward.toml` in the working directory, or the file given with `--config`
//! 2. Environment variables `KEYWARD_<SECTION>__<FIELD>` (e.g. `KEYWARD_CUSTODY__KIND`)
//! 3. Command-line overrides
//!
//! ```toml
//! [token]
//! algorithm = "PS256"
//! lifetime_secs = 3600
//!
//! [custody]
//! kind = "vault_transit"
//! key_name = "jwt-signing-key"
//!
//! [custody.vault]
//! addr = "https://vault.internal:8200"
//! token = "s.xxxxx"
//! ```

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use keyward::{DEFAULT_TOKEN_LIFETIME_SECS, SigningAlgorithm, TokenConfig};
use keyward_custody::CustodyConfig;
use serde::Deserialize;

use crate::error::CliResult;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "KEYWARD";

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "keyward.toml";

/// Everything the CLI needs to build a custodian, issuer and verifier
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Token parameters
    #[serde(default)]
    pub token: TokenSettings,
    /// Key custody strategy
    pub custody: CustodyConfig,
}

/// `[token]` section
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSettings {
    /// Issuer tag, defaults to the custody strategy's tag
    #[serde(default)]
    pub issuer: Option<String>,
    /// Signing algorithm
    #[serde(default = "default_algorithm")]
    pub algorithm: SigningAlgorithm,
    /// Token lifetime in seconds
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: None,
            algorithm: default_algorithm(),
            lifetime_secs: default_lifetime_secs(),
        }
    }
}

fn default_algorithm() -> SigningAlgorithm {
    SigningAlgorithm::RS256
}

fn default_lifetime_secs() -> i64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--issuer`
    pub issuer: Option<String>,
    /// `--algorithm`
    pub algorithm: Option<SigningAlgorithm>,
}

impl Settings {
    /// Load from the process environment
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> CliResult<Self> {
        Self::load_with_env(path, overrides, None)
    }

    /// Load with an explicit environment instead of the process one
    pub fn load_with_env(
        path: Option<&Path>,
        overrides: &Overrides,
        env: Option<HashMap<String, String>>,
    ) -> CliResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .set_override_option("token.issuer", overrides.issuer.clone())?
            .set_override_option(
                "token.algorithm",
                overrides.algorithm.map(|a| a.as_str().to_string()),
            )?
            .build()?
            .try_deserialize()?;

        settings.token_config().validate()?;
        Ok(settings)
    }

    /// Token configuration with the issuer default applied
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        let issuer = self
            .token
            .issuer
            .clone()
            .unwrap_or_else(|| self.custody.default_issuer().to_string());
        TokenConfig::new(issuer, self.token.algorithm).with_lifetime_secs(self.token.lifetime_secs)
    }
}
