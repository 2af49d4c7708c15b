//! Error types for token acquisition.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("failed to open configuration file {path:?}: {source}")]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file {path:?}: {source}")]
    ConfigParse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Token file could not be written.
    #[error("failed to write token file {path:?}: {source}")]
    TokenFile {
        /// Path of the token file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The redirect listener could not be bound.
    #[error("failed to bind redirect listener on {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind.
        addr: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// `OAuth2` error from server.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// Invalid token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// The `state` returned on the redirect does not match the one sent.
    #[error("authorization redirect carried an unexpected state parameter")]
    StateMismatch,

    /// User denied authorization.
    #[error("User denied authorization")]
    AccessDenied,

    /// The redirect listener stopped before delivering a result.
    #[error("redirect listener stopped before authorization completed")]
    ListenerClosed,

    /// Authorization timeout.
    #[error("Authorization timed out after {0:?}")]
    Timeout(Duration),

    /// The acquisition was cancelled before a token arrived.
    #[error("token acquisition cancelled")]
    Cancelled,

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true if the acquisition ended because it was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
