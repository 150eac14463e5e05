//! Token Entity
//!
//! Tokens are opaque random strings. Everything else about a token lives in
//! the token store and is looked up by value.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purpose of a token, fixed at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    /// Short-lived; authorizes ordinary requests.
    Access,
    /// Long-lived; mints new access tokens.
    Refresh,
    /// Delivered by SMS; proves control of the phone number.
    Confirm,
}

impl TokenKind {
    /// Integer code persisted in the `tokens.token_type` column.
    pub fn code(self) -> i32 {
        match self {
            TokenKind::Access => 0,
            TokenKind::Refresh => 1,
            TokenKind::Confirm => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TokenKind::Access),
            1 => Some(TokenKind::Refresh),
            2 => Some(TokenKind::Confirm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Confirm => "confirm",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored token record. Never updated; expiry is checked on read.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub kind: TokenKind,
    pub username: String,
}

impl Token {
    /// A token is valid strictly before its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("kind", &self.kind)
            .field("username", &self.username)
            .finish()
    }
}
