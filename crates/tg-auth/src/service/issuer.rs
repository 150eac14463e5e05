//! Token Issuer
//!
//! Mints opaque token values from the OS CSPRNG and stamps them with the
//! lifetime configured for their kind.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tg_config::TokenConfig;

use crate::domain::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    token_bytes: usize,
    access_ttl: Duration,
    refresh_ttl: Duration,
    confirm_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        token_bytes: usize,
        access_ttl: Duration,
        refresh_ttl: Duration,
        confirm_ttl: Duration,
    ) -> Self {
        Self {
            token_bytes: token_bytes.max(1),
            access_ttl,
            refresh_ttl,
            confirm_ttl,
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            config.bytes,
            config.access_ttl(),
            config.refresh_ttl(),
            config.confirm_ttl(),
        )
    }

    /// Length of generated values in hex characters.
    pub fn value_len(&self) -> usize {
        self.token_bytes * 2
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Confirm => self.confirm_ttl,
        }
    }

    /// Fresh random value, lowercase hex.
    pub fn generate_value(&self) -> String {
        let mut bytes = vec![0u8; self.token_bytes];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Build (but do not store) a token of `kind` for `username`.
    pub fn issue(&self, kind: TokenKind, username: &str, now: DateTime<Utc>) -> Token {
        let expires_at = chrono::Duration::from_std(self.ttl(kind))
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Token {
            value: self.generate_value(),
            expires_at,
            kind,
            username: username.to_string(),
        }
    }
}
