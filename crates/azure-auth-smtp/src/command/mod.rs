//! SMTP command serialization.

use crate::types::Address;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin SASL authentication
    Auth {
        /// SASL mechanism name
        mechanism: String,
        /// Base64 initial response; `=` stands for an empty one
        initial_response: Option<String>,
    },
    /// Base64 response to a `334` challenge
    AuthResponse(String),
    /// `*` - abort the SASL exchange
    AuthCancel,
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(ir),
            } => format!("AUTH {mechanism} {ir}"),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {mechanism}"),
            Self::AuthResponse(response) => response.clone(),
            Self::AuthCancel => "*".to_string(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
        .into_bytes();

        line.extend_from_slice(b"\r\n");
        line
    }

    /// Returns what may be logged about the command; credentials are elided.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::AuthResponse(_) => "AUTH response",
            Self::AuthCancel => "AUTH cancel",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo { .. } => "RCPT TO",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "localhost".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO localhost\r\n");
    }

    #[test]
    fn test_auth_with_initial_response() {
        let cmd = Command::Auth {
            mechanism: "XOAUTH2".to_string(),
            initial_response: Some("dXNlcj0BAQ==".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH XOAUTH2 dXNlcj0BAQ==\r\n");
    }

    #[test]
    fn test_auth_cancel() {
        assert_eq!(Command::AuthCancel.serialize(), b"*\r\n");
        assert_eq!(
            Command::AuthResponse(String::new()).serialize(),
            b"\r\n"
        );
    }

    #[test]
    fn test_envelope_commands() {
        let from = Address::new("sender@example.com").unwrap();
        let to = Address::new("recipient@example.com").unwrap();
        assert_eq!(
            Command::MailFrom { from }.serialize(),
            b"MAIL FROM:<sender@example.com>\r\n"
        );
        assert_eq!(
            Command::RcptTo { to }.serialize(),
            b"RCPT TO:<recipient@example.com>\r\n"
        );
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_verb_hides_credentials() {
        let cmd = Command::Auth {
            mechanism: "XOAUTH2".to_string(),
            initial_response: Some("c2VjcmV0".to_string()),
        };
        assert_eq!(cmd.verb(), "AUTH");
    }
}
