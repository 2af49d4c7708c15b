//! Type-state SMTP client.

use std::marker::PhantomData;

use azure_auth_oauth::SaslClient;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, instrument, warn};

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, Extension, Reply, ReplyCode};

/// Type-state marker: greeted, not authenticated.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: SASL exchange succeeded.
#[derive(Debug)]
pub struct Authenticated;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the server refuses
    /// the session.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(%hostname, "connected");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: Vec::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects EHLO.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .expect_success(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or the upgrade fails.
    pub async fn starttls(mut self, hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect_success(Command::StartTls).await?;
        self.stream = self.stream.upgrade_to_tls(hostname).await?;
        debug!("connection upgraded to TLS");

        self.ehlo(client_hostname).await
    }

    /// Runs `AUTH` with a SASL client mechanism.
    ///
    /// The initial response goes on the `AUTH` line. Every `334` challenge is
    /// decoded and handed to the mechanism; if it fails, the exchange is
    /// aborted with `*` and the mechanism's error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the mechanism failed, or the server's
    /// error reply if it refused the credentials.
    #[instrument(skip_all)]
    pub async fn authenticate(
        mut self,
        mechanism: &mut dyn SaslClient,
    ) -> Result<Client<Authenticated>> {
        let (name, initial) = mechanism.start()?;
        if !self.server_info.supports_auth(name) {
            debug!(mechanism = name, "mechanism not advertised, trying anyway");
        }

        let initial_response = if initial.is_empty() {
            "=".to_string()
        } else {
            STANDARD.encode(initial)
        };
        let mut reply = self
            .send_command(Command::Auth {
                mechanism: name.to_string(),
                initial_response: Some(initial_response),
            })
            .await?;

        loop {
            match reply.code {
                ReplyCode::AUTH_SUCCESS => break,
                ReplyCode::AUTH_CONTINUE => {
                    let encoded = reply.message.first().map_or("", |s| s.trim());
                    let Ok(challenge) = STANDARD.decode(encoded) else {
                        self.cancel_auth().await;
                        return Err(Error::Protocol(format!(
                            "challenge is not base64: {encoded}"
                        )));
                    };

                    match mechanism.next(&challenge) {
                        Ok(response) => {
                            reply = self
                                .send_command(Command::AuthResponse(STANDARD.encode(response)))
                                .await?;
                        }
                        Err(e) => {
                            self.cancel_auth().await;
                            return Err(Error::Auth(e));
                        }
                    }
                }
                code => {
                    return Err(Error::smtp_error(code.as_u16(), reply.message_text()));
                }
            }
        }

        debug!(mechanism = name, "authenticated");
        Ok(self.transition())
    }

    /// Sends one message without authenticating.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects any step of the transaction.
    pub async fn send(&mut self, from: &Address, recipients: &[Address], body: &[u8]) -> Result<()> {
        self.transaction(from, recipients, body).await
    }

    async fn cancel_auth(&mut self) {
        match self.send_command(Command::AuthCancel).await {
            Ok(reply) => debug!(code = %reply.code, "authentication aborted"),
            Err(e) => warn!(error = %e, "failed to abort authentication"),
        }
    }
}

impl Client<Authenticated> {
    /// Sends one message: `MAIL FROM`, `RCPT TO` per recipient, `DATA`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects any step of the transaction.
    pub async fn send(&mut self, from: &Address, recipients: &[Address], body: &[u8]) -> Result<()> {
        self.transaction(from, recipients, body).await
    }
}

impl<S> Client<S> {
    /// Returns what the server advertised.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true once the connection is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers QUIT with an error.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(recipients = recipients.len()))]
    async fn transaction(
        &mut self,
        from: &Address,
        recipients: &[Address],
        body: &[u8],
    ) -> Result<()> {
        if recipients.is_empty() {
            return Err(Error::NoRecipients);
        }
        if let Some(limit) = self.server_info.max_message_size()
            && body.len() > limit
        {
            return Err(Error::MessageTooLarge {
                size: body.len(),
                limit,
            });
        }

        self.expect_success(Command::MailFrom { from: from.clone() })
            .await?;
        for to in recipients {
            self.expect_success(Command::RcptTo { to: to.clone() })
                .await?;
        }

        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        self.stream.write_all(&dot_stuff(body)).await?;
        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        debug!("message accepted");
        Ok(())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        debug!(command = cmd.verb(), code = %reply.code, "reply");
        Ok(reply)
    }

    async fn expect_success(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if !reply.is_success() {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(reply)
    }

    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }
    parse_reply(&lines)
}

/// Normalizes line endings to CRLF, doubles leading dots and appends the
/// terminating `.` line.
fn dot_stuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 16);
    let body = body.strip_suffix(b"\n").unwrap_or(body);
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}
