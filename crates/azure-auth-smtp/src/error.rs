//! Error types for SMTP submission.

use std::io;

use azure_auth_oauth::SaslError;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned an error reply.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Message from the server.
        message: String,
    },

    /// Unexpected or malformed server response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Feature not supported by the server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// The SASL mechanism failed or the server rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(#[from] SaslError),

    /// Message exceeds the size the server advertised.
    #[error("message of {size} bytes exceeds the server limit of {limit} bytes")]
    MessageTooLarge {
        /// Message size.
        size: usize,
        /// Advertised `SIZE` limit.
        limit: usize,
    },

    /// Credentials would cross the network unencrypted.
    #[error("refusing to authenticate to {0} without TLS")]
    InsecureAuth(String),

    /// No recipients were given.
    #[error("no recipients")]
    NoRecipients,

    /// Envelope address that cannot be put on the wire.
    #[error("Invalid email address: {0:?}")]
    InvalidAddress(String),

    /// Server address is not `host:port`.
    #[error("invalid server address {0:?}, expected host:port")]
    InvalidServer(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }
}
