//! Command-line options shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use azure_auth_oauth::{AuthorizationConfig, FileTokenStore, TokenAcquirer};
use clap::Args;

/// Where the configuration and token cache live.
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Path to the YAML configuration file
    /// [default: <config dir>/azure/config.yaml]
    #[arg(short, long, env = "AZURE_AUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the token cache file
    /// [default: <config dir>/azure/token.json]
    #[arg(short, long, env = "AZURE_AUTH_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Give up waiting for the browser redirect after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl TokenArgs {
    /// Loads the configuration and builds an acquirer backed by the token file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is incomplete.
    pub fn acquirer(&self) -> anyhow::Result<TokenAcquirer> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => AuthorizationConfig::default_path()?,
        };
        let config = AuthorizationConfig::load(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?;

        let store = match &self.token_file {
            Some(path) => FileTokenStore::new(path),
            None => FileTokenStore::default_location()?,
        };

        let mut acquirer = TokenAcquirer::new(config, Arc::new(store))?;
        if let Some(secs) = self.timeout {
            acquirer = acquirer.with_timeout(Duration::from_secs(secs));
        }
        Ok(acquirer)
    }
}
