//! Identity provider configuration.
//!
//! The configuration lives in `<config dir>/azure/config.yaml`:
//!
//! ```yaml
//! username: alice@example.com
//! tenantID: 00000000-0000-0000-0000-000000000000
//! clientID: 11111111-1111-1111-1111-111111111111
//! clientSecret: s3cr3t
//! scopes:
//!   - https://outlook.office.com/SMTP.Send
//!   - offline_access
//! redirect:
//!   host: localhost
//!   port: 8080
//!   path: /oauth2/callback
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::provider::Provider;

/// Default Microsoft identity platform authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Directory (under the user configuration directory) holding our files.
pub(crate) const CONFIG_SUBDIR: &str = "azure";

/// Authorization parameters for a single user.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationConfig {
    /// Mailbox user name, also used as the SASL identity.
    pub username: String,
    /// Azure AD tenant ID.
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    /// Application (client) ID.
    #[serde(rename = "clientID")]
    pub client_id: String,
    /// Client secret, for confidential app registrations.
    #[serde(rename = "clientSecret", default)]
    pub client_secret: Option<String>,
    /// Scopes to request.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Local redirect listener settings.
    #[serde(default)]
    pub redirect: Option<RedirectConfig>,
    /// Identity platform authority.
    #[serde(default = "default_authority")]
    pub authority: String,
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

/// Redirect listener settings, matching the app registration's redirect URI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectConfig {
    /// Host name the listener binds and the redirect URI names.
    pub host: String,
    /// TCP port; `0` lets the operating system pick one.
    pub port: u16,
    /// Route path of the redirect handler.
    #[serde(default)]
    pub path: String,
}

impl RedirectConfig {
    /// Returns the redirect URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_for_port(self.port)
    }

    /// Returns the redirect URL with an explicit port.
    #[must_use]
    pub fn url_for_port(&self, port: u16) -> String {
        format!(
            "http://{}:{port}/{}",
            self.host,
            self.path.trim_matches('/')
        )
    }

    /// Returns the route path served by the redirect listener.
    #[must_use]
    pub fn route(&self) -> String {
        format!("/{}", self.path.trim_matches('/'))
    }

    /// The path is served as a literal route, so router captures and
    /// wildcards are rejected.
    fn validate_path(&self) -> Result<()> {
        let literal = self.path.split('/').all(|segment| {
            !segment.starts_with([':', '*']) && !segment.contains(['{', '}'])
        });
        if literal {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "redirect path {:?} must be a literal path",
                self.path
            )))
        }
    }
}

impl AuthorizationConfig {
    /// Creates a configuration with the required fields.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: None,
            scopes: Vec::new(),
            redirect: None,
            authority: default_authority(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the redirect listener.
    #[must_use]
    pub fn with_redirect(mut self, host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        self.redirect = Some(RedirectConfig {
            host: host.into(),
            port,
            path: path.into(),
        });
        self
    }

    /// Overrides the identity platform authority.
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Returns the default configuration file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_SUBDIR).join("config.yaml"))
            .ok_or_else(|| {
                Error::InvalidConfig("failed to determine configuration directory".into())
            })
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&data).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses a configuration from YAML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the text is not a valid configuration.
    pub fn from_yaml(data: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(data)
    }

    /// Validates that everything needed for the authorization flow is set.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing setting.
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::InvalidConfig("username is empty".into()));
        }
        if self.tenant_id.is_empty() {
            return Err(Error::InvalidConfig("tenantID is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(Error::InvalidConfig("clientID is empty".into()));
        }
        match &self.redirect {
            None => Err(Error::InvalidConfig("redirect settings are missing".into())),
            Some(redirect) if redirect.host.is_empty() => {
                Err(Error::InvalidConfig("redirect host is empty".into()))
            }
            Some(redirect) => redirect.validate_path(),
        }
    }

    /// Returns the redirect settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no redirect is configured.
    pub fn redirect(&self) -> Result<&RedirectConfig> {
        self.redirect
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("redirect settings are missing".into()))
    }

    /// Returns the Azure AD provider for the configured tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority does not form valid URLs.
    pub fn provider(&self) -> Result<Provider> {
        Ok(Provider::azure_ad_with_authority(&self.authority, &self.tenant_id)?
            .with_default_scopes(self.scopes.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
username: alice@example.com
tenantID: contoso
clientID: client-123
clientSecret: hunter2
scopes:
  - https://outlook.office.com/SMTP.Send
  - offline_access
redirect:
  host: localhost
  port: 8080
  path: /oauth2/callback/
";

    #[test]
    fn test_parse_yaml() {
        let config = AuthorizationConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.username, "alice@example.com");
        assert_eq!(config.tenant_id, "contoso");
        assert_eq!(config.client_id, "client-123");
        assert_eq!(config.client_secret.as_deref(), Some("hunter2"));
        assert_eq!(config.scopes.len(), 2);
        assert_eq!(config.authority, DEFAULT_AUTHORITY);
        config.validate().unwrap();
    }

    #[test]
    fn test_redirect_url_trims_slashes() {
        let config = AuthorizationConfig::from_yaml(SAMPLE).unwrap();
        let redirect = config.redirect().unwrap();
        assert_eq!(redirect.url(), "http://localhost:8080/oauth2/callback");
        assert_eq!(redirect.route(), "/oauth2/callback");
        assert_eq!(
            redirect.url_for_port(9999),
            "http://localhost:9999/oauth2/callback"
        );
    }

    #[test]
    fn test_empty_redirect_path() {
        let redirect = RedirectConfig {
            host: "127.0.0.1".into(),
            port: 80,
            path: String::new(),
        };
        assert_eq!(redirect.url(), "http://127.0.0.1:80/");
        assert_eq!(redirect.route(), "/");
    }

    #[test]
    fn test_missing_redirect_is_invalid() {
        let config = AuthorizationConfig::new("alice@example.com", "contoso", "client-123");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_username_is_invalid() {
        let config = AuthorizationConfig::new("", "contoso", "client-123")
            .with_redirect("localhost", 8080, "/");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_redirect_path_with_route_syntax_is_invalid() {
        for path in ["/oauth2/:code", "/*rest", "/oauth2/{id}", "/cb}"] {
            let config = AuthorizationConfig::new("alice@example.com", "contoso", "client-123")
                .with_redirect("localhost", 8080, path);
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(ref m)) if m.contains(path)),
                "{path} accepted"
            );
        }
    }

    #[test]
    fn test_redirect_path_may_contain_colons_inside_segments() {
        let config = AuthorizationConfig::new("alice@example.com", "contoso", "client-123")
            .with_redirect("localhost", 8080, "/oauth2/v2:callback");
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuthorizationConfig::load(dir.path().join("config.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_load_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "username: [unterminated").unwrap();
        let err = AuthorizationConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = AuthorizationConfig::load(&path).unwrap();
        assert_eq!(config.redirect().unwrap().port, 8080);
    }

    #[test]
    fn test_provider_for_tenant() {
        let config = AuthorizationConfig::from_yaml(SAMPLE).unwrap();
        let provider = config.provider().unwrap();
        assert_eq!(
            provider.token_url.as_str(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
        assert_eq!(provider.default_scopes, config.scopes);
    }
}
