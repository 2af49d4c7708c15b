//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::Extension;

/// Server capabilities from the EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from the greeting.
    pub hostname: String,
    /// Advertised extensions, in reply order.
    pub extensions: Vec<Extension>,
}

impl ServerInfo {
    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Checks if the SASL mechanism `name` is advertised.
    #[must_use]
    pub fn supports_auth(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| match ext {
            Extension::Auth(mechanisms) => mechanisms.iter().any(|m| m.eq_ignore_ascii_case(name)),
            _ => false,
        })
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "smtp.example.com".into(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn test_capabilities() {
        let info = info(&["STARTTLS", "AUTH LOGIN XOAUTH2", "SIZE 157286400"]);
        assert!(info.supports_starttls());
        assert!(info.supports_auth("XOAUTH2"));
        assert!(info.supports_auth("xoauth2"));
        assert!(!info.supports_auth("PLAIN"));
        assert_eq!(info.max_message_size(), Some(157_286_400));
    }

    #[test]
    fn test_no_capabilities() {
        let info = info(&["PIPELINING"]);
        assert!(!info.supports_starttls());
        assert!(!info.supports_auth("XOAUTH2"));
        assert_eq!(info.max_message_size(), None);
    }
}
