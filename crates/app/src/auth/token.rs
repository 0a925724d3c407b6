//! Bearer access token handling.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Opaque bearer credential issued by the backend on login.
///
/// The raw value is only reachable through [`AccessToken::expose`] and is wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token. Surrounding whitespace is trimmed; an empty token yields `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let mut raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            raw.zeroize();
            return None;
        }

        let token = Self(trimmed.to_string());

        raw.zeroize();

        Some(token)
    }

    /// Raw token value for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(**redacted**)")?;
        Ok(())
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
