//! XOAUTH2 SASL client mechanism.
//!
//! XOAUTH2 sends a single initial response carrying the user name and a
//! bearer token. The server never asks for more: a challenge after the
//! initial response is a JSON error document, and the client's only job is
//! to surface it.
//!
//! ```text
//! Initial ── start() ──→ (XOAUTH2, "user=..\x01auth=Bearer ..\x01\x01")
//!    │
//!    └── next(challenge) ──→ ChallengeHandled ── Err(Rejected | MalformedChallenge)
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Mechanism name advertised by servers and sent in `AUTH`/`AUTHENTICATE`.
pub const XOAUTH2: &str = "XOAUTH2";

/// Field separator of the XOAUTH2 initial response (SOH).
const SEPARATOR: char = '\x01';

/// Client side of a SASL mechanism.
///
/// The protocol client calls [`start`](Self::start) once, sends the initial
/// response, then feeds every server challenge to [`next`](Self::next) until
/// the server reports success or failure.
pub trait SaslClient {
    /// Returns the mechanism name and the initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if the mechanism cannot produce an initial response.
    fn start(&mut self) -> Result<(&'static str, Vec<u8>), SaslError>;

    /// Answers a server challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the challenge cannot be answered.
    fn next(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError>;
}

/// SASL mechanism errors.
#[derive(Debug, thiserror::Error)]
pub enum SaslError {
    /// User name or access token is empty.
    #[error("XOAUTH2 requires a user name and an access token")]
    MissingCredentials,

    /// The server rejected the credentials.
    #[error(transparent)]
    Rejected(#[from] AuthError),

    /// The server's error challenge could not be parsed.
    #[error("malformed XOAUTH2 challenge: {0}")]
    MalformedChallenge(#[from] serde_json::Error),

    /// The exchange already ended; the mechanism cannot be reused.
    #[error("XOAUTH2 exchange already completed")]
    ExchangeComplete,
}

/// Error document sent by the server when it rejects a bearer token.
///
/// Example: `{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("XOAUTH2 authentication error (status {status})")]
pub struct AuthError {
    /// HTTP-style status code.
    pub status: String,
    /// Authentication schemes the server accepts.
    #[serde(default)]
    pub schemes: String,
    /// Scope the server requires.
    #[serde(default)]
    pub scope: String,
}

/// Immutable input of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCredential {
    /// Mailbox user name.
    pub username: String,
    /// `OAuth2` access token.
    pub access_token: String,
}

impl BridgeCredential {
    /// Creates a credential.
    #[must_use]
    pub fn new(username: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: access_token.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    ChallengeHandled,
}

/// XOAUTH2 client mechanism for one authentication attempt.
#[derive(Debug)]
pub struct XOAuth2 {
    credential: BridgeCredential,
    state: State,
}

impl XOAuth2 {
    /// Creates the mechanism.
    #[must_use]
    pub const fn new(credential: BridgeCredential) -> Self {
        Self {
            credential,
            state: State::Initial,
        }
    }

    /// Returns true once a server challenge has been consumed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == State::ChallengeHandled
    }
}

impl SaslClient for XOAuth2 {
    fn start(&mut self) -> Result<(&'static str, Vec<u8>), SaslError> {
        if self.state == State::ChallengeHandled {
            return Err(SaslError::ExchangeComplete);
        }
        let BridgeCredential {
            username,
            access_token,
        } = &self.credential;
        if username.is_empty() || access_token.is_empty() {
            return Err(SaslError::MissingCredentials);
        }
        Ok((XOAUTH2, xoauth2_token(username, access_token).into_bytes()))
    }

    fn next(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        if self.state == State::ChallengeHandled {
            return Err(SaslError::ExchangeComplete);
        }
        self.state = State::ChallengeHandled;

        let error: AuthError = serde_json::from_slice(challenge)?;
        Err(SaslError::Rejected(error))
    }
}

/// Builds the raw XOAUTH2 string: `user=<user>\x01auth=Bearer <token>\x01\x01`.
#[must_use]
pub fn xoauth2_token(user: &str, token: &str) -> String {
    format!("user={user}{SEPARATOR}auth=Bearer {token}{SEPARATOR}{SEPARATOR}")
}

/// Builds the base64-encoded XOAUTH2 string, as entered in mail clients that
/// take a pre-computed XOAUTH2 credential.
///
/// # Example
///
/// ```
/// use azure_auth_oauth::sasl::xoauth2_response;
///
/// let response = xoauth2_response("user@example.com", "eyJ0eXAi...");
/// assert!(!response.contains("user@example.com"));
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    STANDARD.encode(xoauth2_token(user, token).as_bytes())
}
