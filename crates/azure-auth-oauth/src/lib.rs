//! # azure-auth-oauth
//!
//! Azure AD `OAuth2` access tokens for mail protocols (SMTP/IMAP).
//!
//! ## Features
//!
//! - **Token cache**: one JSON token file, owner-only, replaced atomically
//! - **Browser-delegated flow**: authorization code flow with a local
//!   redirect listener, PKCE and `state` checking
//! - **SASL**: an XOAUTH2 client mechanism built from the access token
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use azure_auth_oauth::{AuthorizationConfig, FileTokenStore, TokenAcquirer};
//! use azure_auth_oauth::sasl::{BridgeCredential, XOAuth2};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthorizationConfig::load(AuthorizationConfig::default_path()?)?;
//!     let store = Arc::new(FileTokenStore::default_location()?);
//!     let acquirer = TokenAcquirer::new(config, store)?;
//!
//!     // Returns the cached token, or opens the browser and waits for the redirect.
//!     let token = acquirer.get_token(&CancellationToken::new()).await?;
//!
//!     let mechanism = XOAuth2::new(BridgeCredential::new(
//!         &acquirer.config().username,
//!         &token.access_token,
//!     ));
//!     // Hand `mechanism` to an SMTP or IMAP client.
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod acquire;
pub mod config;
mod error;
pub mod flow;
pub mod provider;
pub mod sasl;
pub mod token;

pub use acquire::{Browser, SystemBrowser, TokenAcquirer};
pub use config::{AuthorizationConfig, RedirectConfig};
pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, OAuthClient, PkceChallenge};
pub use provider::Provider;
pub use sasl::{AuthError, BridgeCredential, SaslClient, SaslError, XOAuth2};
pub use token::{FileTokenStore, MemoryTokenStore, Token, TokenStore};

pub use tokio_util::sync::CancellationToken;
