//! `OAuth2` provider endpoints.

use crate::error::{Error, Result};
use url::Url;

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Azure AD (Microsoft identity platform v2.0) endpoints for a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn azure_ad(tenant: &str) -> Result<Self> {
        Self::azure_ad_with_authority(crate::config::DEFAULT_AUTHORITY, tenant)
    }

    /// Azure AD endpoints for a tenant under a custom authority
    /// (national clouds, or a local stand-in).
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn azure_ad_with_authority(authority: &str, tenant: &str) -> Result<Self> {
        let base = format!("{}/{tenant}/oauth2/v2.0", authority.trim_end_matches('/'));
        Self::new(
            "Microsoft",
            format!("{base}/authorize"),
            format!("{base}/token"),
        )
    }

    /// Validates that required URLs are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        for (label, url) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "{label} must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }
}
