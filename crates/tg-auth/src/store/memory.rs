//! In-memory stores for development and tests.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::{CredentialStore, TokenStore};
use crate::domain::{NewUser, Token, TokenKind, User};
use crate::error::{AuthError, Result};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, User>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, user: &NewUser) -> Result<()> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::duplicate_user(&user.username)),
            Entry::Vacant(slot) => {
                slot.insert(user.clone().into_user());
                Ok(())
            }
        }
    }

    async fn get_user(&self, username: &str) -> Result<User> {
        self.users
            .get(username)
            .map(|u| u.value().clone())
            .ok_or_else(|| AuthError::user_not_found(username))
    }

    async fn confirm_phone(&self, username: &str) -> Result<()> {
        let mut user = self
            .users
            .get_mut(username)
            .ok_or_else(|| AuthError::user_not_found(username))?;
        user.phone_confirmed = true;
        Ok(())
    }

    async fn set_permissions(&self, username: &str, permissions: &BTreeSet<String>) -> Result<()> {
        let mut user = self
            .users
            .get_mut(username)
            .ok_or_else(|| AuthError::user_not_found(username))?;
        user.permissions = permissions.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<String, Token>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Stored tokens of `kind` owned by `username`.
    pub fn tokens_for(&self, username: &str, kind: TokenKind) -> Vec<Token> {
        self.tokens
            .iter()
            .filter(|t| t.username == username && t.kind == kind)
            .map(|t| t.value().clone())
            .collect()
    }

    pub fn count_for(&self, username: &str, kind: TokenKind) -> usize {
        self.tokens_for(username, kind).len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create_token(&self, token: &Token) -> Result<()> {
        match self.tokens.entry(token.value.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateToken),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(())
            }
        }
    }

    async fn get_token(&self, value: &str) -> Result<Token> {
        self.tokens
            .get(value)
            .map(|t| t.value().clone())
            .ok_or(AuthError::TokenNotFound)
    }
}
