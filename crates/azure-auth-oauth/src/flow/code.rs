//! Authorization Code Flow implementation.

use super::{OAuthClient, PkceChallenge};
use crate::error::Result;
use crate::token::Token;
use url::Url;

/// Authorization Code Flow for `OAuth2`.
///
/// The user is sent to [`authorization_url`](Self::authorization_url) in a
/// browser and the provider redirects back with a code, which
/// [`exchange_code`](Self::exchange_code) trades for a token.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: Option<PkceChallenge>,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client, pkce: None }
    }

    /// Enables PKCE.
    #[must_use]
    pub fn with_pkce(mut self) -> Self {
        self.pkce = Some(PkceChallenge::generate());
        self
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Builds the authorization URL for user consent.
    ///
    /// The URL asks for offline access so the provider also issues a
    /// refresh token.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Optional scopes to request (uses provider defaults if None)
    /// * `state` - Optional state parameter for CSRF protection
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub fn authorization_url(&self, scopes: Option<&[String]>, state: Option<&str>) -> Result<Url> {
        let mut url = self.client.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code")
                .append_pair("access_type", "offline");

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            let scope_str = scopes.map_or_else(
                || self.client.provider.default_scopes.join(" "),
                |s| s.join(" "),
            );

            if !scope_str.is_empty() {
                pairs.append_pair("scope", &scope_str);
            }

            if let Some(state_val) = state {
                pairs.append_pair("state", state_val);
            }

            if let Some(pkce) = &self.pkce {
                pairs
                    .append_pair("code_challenge", pkce.challenge())
                    .append_pair("code_challenge_method", pkce.method());
            }
        }

        Ok(url)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        let code_verifier = self.pkce.as_ref().map(PkceChallenge::verifier);
        self.client.exchange_code(code, code_verifier).await
    }

    /// Returns the PKCE verifier if PKCE is enabled.
    #[must_use]
    pub fn pkce_verifier(&self) -> Option<&str> {
        self.pkce.as_ref().map(PkceChallenge::verifier)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::Provider;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(authority: &str) -> OAuthClient {
        let provider = Provider::azure_ad_with_authority(authority, "contoso")
            .unwrap()
            .with_default_scopes(vec![
                "https://outlook.office.com/SMTP.Send".to_string(),
                "offline_access".to_string(),
            ]);
        OAuthClient::new("test_client", provider)
            .with_client_secret("s3cret")
            .with_redirect_uri("http://localhost:8080/callback")
    }

    #[test]
    fn test_authorization_url() {
        let flow = AuthorizationCodeFlow::new(client_for("https://login.microsoftonline.com"));
        let url = flow.authorization_url(None, Some("random_state")).unwrap();

        assert!(url.as_str().starts_with(
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize?"
        ));
        assert!(url.as_str().contains("client_id=test_client"));
        assert!(url.as_str().contains("response_type=code"));
        assert!(url.as_str().contains("access_type=offline"));
        assert!(url.as_str().contains("state=random_state"));
        assert!(
            url.as_str()
                .contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback")
        );
        assert!(
            url.as_str()
                .contains("scope=https%3A%2F%2Foutlook.office.com%2FSMTP.Send+offline_access")
        );
    }

    #[test]
    fn test_authorization_url_with_pkce() {
        let flow =
            AuthorizationCodeFlow::new(client_for("https://login.microsoftonline.com")).with_pkce();
        let url = flow.authorization_url(None, None).unwrap();

        assert!(url.as_str().contains("code_challenge="));
        assert!(url.as_str().contains("code_challenge_method=S256"));
        assert!(flow.pkce_verifier().is_some());
    }

    #[test]
    fn test_authorization_url_custom_scopes() {
        let flow = AuthorizationCodeFlow::new(client_for("https://login.microsoftonline.com"));
        let scopes = vec!["email".to_string(), "profile".to_string()];
        let url = flow.authorization_url(Some(&scopes), None).unwrap();

        assert!(url.as_str().contains("scope=email+profile"));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback",
            ))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "token_type": "Bearer",
                "expires_in": 3599,
                "refresh_token": "rt-1",
                "scope": "https://outlook.office.com/SMTP.Send"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let flow = AuthorizationCodeFlow::new(client_for(&server.uri())).with_pkce();
        let token = flow.exchange_code("the-code").await.unwrap();

        assert_eq!(token.access_token, "at-1");
        assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
        assert!(token.is_valid());
    }

    #[tokio::test]
    async fn test_exchange_code_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS54005: code already redeemed"
            })))
            .mount(&server)
            .await;

        let flow = AuthorizationCodeFlow::new(client_for(&server.uri()));
        let err = flow.exchange_code("stale").await.unwrap_err();

        assert!(matches!(err, Error::OAuth { ref error, .. } if error == "invalid_grant"));
    }

    #[tokio::test]
    async fn test_exchange_code_non_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let flow = AuthorizationCodeFlow::new(client_for(&server.uri()));
        let err = flow.exchange_code("code").await.unwrap_err();

        match err {
            Error::InvalidResponse(message) => {
                assert!(message.contains("503"));
                assert!(message.contains("upstream down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
