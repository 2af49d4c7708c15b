//! Prints an access token for the configured mailbox, running the browser
//! flow first when the cached token is missing or expired.

use anyhow::Context;
use azure_auth::cli::TokenArgs;
use azure_auth_oauth::sasl::xoauth2_response;
use clap::Parser;

/// Obtain an Azure AD access token for mail
#[derive(Parser, Debug)]
#[command(name = "azure-token", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    token: TokenArgs,

    /// Print the base64 XOAUTH2 string instead of the bare access token
    #[arg(long)]
    xoauth2: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    azure_auth::init_tracing();
    let cli = Cli::parse();

    let acquirer = cli.token.acquirer()?;
    let cancel = azure_auth::cancel_on_interrupt();
    let token = acquirer
        .get_token(&cancel)
        .await
        .context("failed to obtain access token")?;

    if cli.xoauth2 {
        println!(
            "{}",
            xoauth2_response(&acquirer.config().username, &token.access_token)
        );
    } else {
        println!("{}", token.access_token);
    }
    Ok(())
}
