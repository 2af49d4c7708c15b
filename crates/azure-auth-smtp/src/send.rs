//! One-shot message submission.

use std::net::IpAddr;

use azure_auth_oauth::SaslClient;
use tracing::{debug, info, instrument};

use crate::connection::{Client, connect, connect_tls};
use crate::error::{Error, Result};
use crate::types::Address;

/// Name sent in EHLO.
const CLIENT_HOSTNAME: &str = "localhost";

/// Port that speaks TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Submits `body` to `server` (`host:port`) for `recipients`.
///
/// Upgrades with STARTTLS when the server offers it and authenticates with
/// `mechanism` when one is given. Port 465 uses implicit TLS. Credentials
/// go out in plaintext only to a loopback host.
///
/// # Errors
///
/// Returns [`Error::NoRecipients`] or [`Error::InvalidAddress`] before
/// connecting, [`Error::InsecureAuth`] if authentication would happen
/// without TLS, [`Error::Auth`] if the SASL exchange failed, and the
/// server's reply for any rejected step.
#[instrument(skip(mechanism, from, recipients, body), fields(recipients = recipients.len()))]
pub async fn send_mail(
    server: &str,
    mechanism: Option<&mut dyn SaslClient>,
    from: &str,
    recipients: &[String],
    body: &[u8],
) -> Result<()> {
    if recipients.is_empty() {
        return Err(Error::NoRecipients);
    }
    let from = Address::new(from)?;
    let recipients = recipients
        .iter()
        .map(Address::new)
        .collect::<Result<Vec<_>>>()?;
    let (host, port) = split_server(server)?;

    let stream = if port == IMPLICIT_TLS_PORT {
        connect_tls(host, port).await?
    } else {
        connect(host, port).await?
    };
    let mut client = Client::from_stream(stream)
        .await?
        .ehlo(CLIENT_HOSTNAME)
        .await?;
    if client.server_info().supports_starttls() {
        client = client.starttls(host, CLIENT_HOSTNAME).await?;
    } else {
        debug!("server does not offer STARTTLS");
    }

    match mechanism {
        Some(mechanism) => {
            if !client.is_tls() && !is_loopback(host) {
                return Err(Error::InsecureAuth(host.to_string()));
            }
            let mut client = client.authenticate(mechanism).await?;
            client.send(&from, &recipients, body).await?;
            client.quit().await?;
        }
        None => {
            client.send(&from, &recipients, body).await?;
            client.quit().await?;
        }
    }

    info!("message submitted");
    Ok(())
}

fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

fn split_server(server: &str) -> Result<(&str, u16)> {
    let (host, port) = server
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidServer(server.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = port
        .parse()
        .map_err(|_| Error::InvalidServer(server.to_string()))?;
    if host.is_empty() {
        return Err(Error::InvalidServer(server.to_string()));
    }
    Ok((host, port))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_server() {
        assert_eq!(
            split_server("smtp.office365.com:587").unwrap(),
            ("smtp.office365.com", 587)
        );
        assert_eq!(split_server("[::1]:25").unwrap(), ("::1", 25));
    }

    #[test]
    fn test_split_server_rejects_missing_port() {
        assert!(matches!(
            split_server("smtp.office365.com"),
            Err(Error::InvalidServer(_))
        ));
        assert!(split_server("smtp.office365.com:smtp").is_err());
        assert!(split_server(":587").is_err());
    }

    #[test]
    fn test_plaintext_auth_only_to_loopback() {
        assert!(is_loopback("127.0.0.1"));
        assert!(is_loopback("::1"));
        assert!(is_loopback("LocalHost"));
        assert!(!is_loopback("smtp.office365.com"));
        assert!(!is_loopback("192.0.2.10"));
        assert!(!is_loopback("localhost.example.com"));
    }

    #[tokio::test]
    async fn test_no_recipients_fails_before_connecting() {
        let err = send_mail("127.0.0.1:1", None, "a@example.com", &[], b"hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRecipients));
    }

    #[tokio::test]
    async fn test_line_break_in_recipient_fails_before_connecting() {
        let recipients = vec!["bob@example.com\r\nDATA".to_string()];
        let err = send_mail("127.0.0.1:1", None, "a@example.com", &recipients, b"hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }
}
