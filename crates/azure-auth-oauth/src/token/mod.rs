//! `OAuth2` token types.

mod store;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use crate::error::Error;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_LEEWAY_SECS: i64 = 10;

/// `OAuth2` access token with metadata.
///
/// Serializes to the `access_token`/`token_type`/`refresh_token`/`expiry`
/// schema used by the on-disk token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: String,
    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiration time.
    #[serde(
        default,
        deserialize_with = "deserialize_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// Other tools writing this schema store "no expiry" as the zero time.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|at| at.year() > 1))
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token: None,
            expiry: None,
        }
    }

    /// Creates a token from token response.
    #[must_use]
    pub fn from_response(response: TokenResponse) -> Self {
        let expiry = response.expires_in.map(|secs| {
            let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::from(u32::MAX));
            Utc::now() + Duration::seconds(secs)
        });

        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token,
            expiry,
        }
    }

    /// Checks if the token is expired (with a short leeway).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiry
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECS) >= exp)
    }

    /// Returns true if the token can be used as-is.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// Token response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    pub token_type: String,
    /// Expires in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Error response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        if self.error == "access_denied" {
            return Error::AccessDenied;
        }
        Error::oauth_error(self.error, self.error_description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("access123", "Bearer");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expiry.is_none());
        assert!(token.refresh_token.is_none());
        assert!(token.is_valid());
    }

    #[test]
    fn test_token_expiration() {
        let expired =
            Token::new("access123", "Bearer").with_expiry(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());
        assert!(!expired.is_valid());

        let valid =
            Token::new("access123", "Bearer").with_expiry(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
        assert!(valid.is_valid());
    }

    #[test]
    fn test_token_within_leeway_is_expired() {
        let token = Token::new("access123", "Bearer").with_expiry(Utc::now() + Duration::seconds(5));
        assert!(token.is_expired());
    }

    #[test]
    fn test_empty_access_token_is_invalid() {
        let token = Token::new("", "Bearer");
        assert!(!token.is_valid());
    }

    #[test]
    fn test_token_from_response() {
        let response = TokenResponse {
            access_token: "test_token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: Some("refresh".to_string()),
            scope: Some("email".to_string()),
        };

        let token = Token::from_response(response);
        assert_eq!(token.access_token, "test_token");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert!(token.expiry.is_some());
        assert!(token.is_valid());
    }

    #[test]
    fn test_cache_schema_field_names() {
        let token = Token::new("a", "Bearer")
            .with_refresh_token("r")
            .with_expiry("2030-01-02T03:04:05Z".parse().unwrap());
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["access_token"], "a");
        assert_eq!(value["token_type"], "Bearer");
        assert_eq!(value["refresh_token"], "r");
        assert_eq!(value["expiry"], "2030-01-02T03:04:05Z");
    }

    #[test]
    fn test_expiry_with_offset_and_fraction() {
        let json = r#"{"access_token":"a","token_type":"Bearer","refresh_token":"r","expiry":"2030-01-02T04:04:05.123456789+01:00"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        let expected: DateTime<Utc> = "2030-01-02T03:04:05.123456789Z".parse().unwrap();
        assert_eq!(token.expiry, Some(expected));
    }

    #[test]
    fn test_zero_expiry_means_no_expiry() {
        let json = r#"{"access_token":"a","token_type":"Bearer","expiry":"0001-01-01T00:00:00Z"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert!(token.expiry.is_none());
        assert!(token.is_valid());
    }

    #[test]
    fn test_error_response_access_denied() {
        let response = ErrorResponse {
            error: "access_denied".into(),
            error_description: "user said no".into(),
        };
        assert!(matches!(response.into_error(), Error::AccessDenied));
    }

    #[test]
    fn test_error_response_into_oauth_error() {
        let json = r#"{"error":"invalid_grant","error_description":"AADSTS70000"}"#;
        let response: ErrorResponse = serde_json::from_str(json).unwrap();
        match response.into_error() {
            Error::OAuth { error, description } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description, "AADSTS70000");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
