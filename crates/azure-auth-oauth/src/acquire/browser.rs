//! Handing the authorization URL to the user.

use std::io;

use url::Url;

/// Opens the authorization URL for the user.
pub trait Browser: Send + Sync {
    /// Opens `url`, typically in the default web browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL could not be opened; the caller then
    /// falls back to printing it.
    fn open(&self, url: &Url) -> io::Result<()>;
}

/// The operating system's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &Url) -> io::Result<()> {
        opener::open_browser(url.as_str()).map_err(io::Error::other)
    }
}

/// Tells the user how to finish the flow when no browser could be launched.
pub(crate) fn print_manual_instructions(url: &Url, error: &io::Error) {
    println!("failed to launch browser automatically: {error}");
    println!();
    println!("1. Ensure that you are logged in as your user in your browser.");
    println!();
    println!("2. Open the following link and authorise the XOAUTH2 token:");
    println!("{url}");
    println!();
}
