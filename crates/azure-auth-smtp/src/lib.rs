//! # azure-auth-smtp
//!
//! SMTP submission client (RFC 5321) that authenticates through any
//! [`SaslClient`](azure_auth_oauth::SaslClient), such as the XOAUTH2 bridge.
//!
//! ## Quick Start
//!
//! ```ignore
//! use azure_auth_oauth::{BridgeCredential, XOAuth2};
//! use azure_auth_smtp::send_mail;
//!
//! let mut mechanism = XOAuth2::new(BridgeCredential::new("alice@contoso.com", token));
//! send_mail(
//!     "smtp.office365.com:587",
//!     Some(&mut mechanism),
//!     "alice@contoso.com",
//!     &["bob@contoso.com".to_string()],
//!     b"Subject: hello\r\n\r\nHi Bob\r\n",
//! )
//! .await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── authenticate(mechanism) ───→ Authenticated
//! └──────────────┘                                       │
//!        │                                               │
//!        └──────────── send() / quit() ──────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
mod send;
pub mod types;

pub use connection::{Authenticated, Client, Connected, ServerInfo, SmtpStream};
pub use error::{Error, Result};
pub use send::send_mail;
pub use types::{Address, Extension, Reply, ReplyCode};
