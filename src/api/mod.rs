mod client;
mod envelope;
mod error;
mod marketplace;

#[cfg(test)]
pub(crate) mod fake;

pub use client::ApiClient;
pub use envelope::{extract_message, normalize, GENERIC_ERROR};
pub use error::ApiError;
pub use marketplace::{parse_availability, Marketplace};

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Bearer JWT forwarded to the marketplace on behalf of the browser.
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}
