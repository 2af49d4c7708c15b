//! Sends the message read from stdin through an XOAUTH2-authenticated SMTP
//! session.

use anyhow::Context;
use azure_auth::DEFAULT_SMTP_SERVER;
use azure_auth::cli::TokenArgs;
use clap::Parser;
use tokio::io::AsyncReadExt;

/// Send mail as the configured Azure AD user; the RFC 5322 message is read
/// from stdin
#[derive(Parser, Debug)]
#[command(name = "send-azure", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    token: TokenArgs,

    /// SMTP submission server
    #[arg(short, long, value_name = "HOST:PORT", default_value = DEFAULT_SMTP_SERVER)]
    server: String,

    /// Envelope recipients
    #[arg(required = true, value_name = "RECIPIENT")]
    recipients: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    azure_auth::init_tracing();
    let cli = Cli::parse();

    let acquirer = cli.token.acquirer()?;
    let mut body = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut body)
        .await
        .context("failed to read message from stdin")?;

    let cancel = azure_auth::cancel_on_interrupt();
    azure_auth::send(
        &cancel,
        &acquirer,
        &acquirer.config().username,
        &cli.server,
        &cli.recipients,
        &body,
    )
    .await
}
