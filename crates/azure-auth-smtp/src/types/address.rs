//! Envelope addresses.

use std::fmt;

use crate::error::{Error, Result};

/// Address for `MAIL FROM` / `RCPT TO`.
///
/// Only checks what would corrupt the command line; the server decides
/// whether the mailbox exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is empty or contains
    /// CR, LF, `<` or `>`.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        if addr.is_empty() || addr.contains(['\r', '\n', '<', '>']) {
            return Err(Error::InvalidAddress(addr));
        }
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
