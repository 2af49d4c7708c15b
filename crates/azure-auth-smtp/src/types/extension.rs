//! SMTP extensions advertised in the EHLO reply.

/// One EHLO keyword with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - SASL mechanism names, upper-cased
    Auth(Vec<String>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// Any other keyword line
    Other(String),
}

impl Extension {
    /// Parses an extension line from the EHLO reply.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Other(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.map(str::to_ascii_uppercase).collect()),
            "SIZE" => Self::Size(parts.next().and_then(|s| s.parse().ok())),
            _ => Self::Other(line.to_string()),
        }
    }
}
