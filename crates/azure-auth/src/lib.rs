//! # azure-auth
//!
//! Shared plumbing for the `azure-token` and `send-azure` binaries.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cli;

use anyhow::{Context, bail};
use azure_auth_oauth::{BridgeCredential, CancellationToken, TokenAcquirer, XOAuth2};
use azure_auth_smtp::send_mail;
use tracing::{info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default submission server for Microsoft 365 mailboxes.
pub const DEFAULT_SMTP_SERVER: &str = "smtp.office365.com:587";

/// Sends `body` from `username` to `recipients` through `server`,
/// authenticating with an XOAUTH2 token from `acquirer`.
///
/// # Errors
///
/// Returns an error naming the step that failed: checking recipients,
/// obtaining the token, or submitting the message.
#[instrument(skip_all, fields(%server, recipients = recipients.len()))]
pub async fn send(
    cancel: &CancellationToken,
    acquirer: &TokenAcquirer,
    username: &str,
    server: &str,
    recipients: &[String],
    body: &[u8],
) -> anyhow::Result<()> {
    if recipients.is_empty() {
        bail!("no recipients given");
    }

    let token = acquirer
        .get_token(cancel)
        .await
        .context("failed to obtain access token")?;

    let mut mechanism = XOAuth2::new(BridgeCredential::new(username, &token.access_token));
    tokio::select! {
        biased;
        () = cancel.cancelled() => bail!("cancelled while sending mail"),
        sent = send_mail(server, Some(&mut mechanism), username, recipients, body) => {
            sent.with_context(|| format!("failed to send mail via {server}"))?;
        }
    }

    info!("mail sent");
    Ok(())
}

/// Installs the global tracing subscriber.
///
/// Logs go to stderr so stdout only carries command output. `RUST_LOG`
/// overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "azure_auth=info,azure_auth_oauth=info,azure_auth_smtp=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Returns a token that is cancelled on Ctrl-C.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupted, cancelling");
                on_interrupt.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    cancel
}
