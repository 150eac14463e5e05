//! Store Layer
//!
//! Contracts for the credential and token stores plus their backends.
//! Each operation must be atomic on its own; callers never read-then-write.

pub mod memory;
pub mod postgres;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{NewUser, Token, User};
use crate::error::Result;

pub use memory::{MemoryCredentialStore, MemoryTokenStore};
pub use postgres::PostgresStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert an unconfirmed user with the default permissions.
    /// Fails `DuplicateUser` if the username is taken.
    async fn create_user(&self, user: &NewUser) -> Result<()>;

    /// Fails `UserNotFound` if absent.
    async fn get_user(&self, username: &str) -> Result<User>;

    /// Set the phone-confirmed flag. Fails `UserNotFound` unless exactly
    /// one record was affected.
    async fn confirm_phone(&self, username: &str) -> Result<()>;

    /// Replace the permission set. Fails `UserNotFound` unless exactly one
    /// record was affected.
    async fn set_permissions(&self, username: &str, permissions: &BTreeSet<String>) -> Result<()>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fails `DuplicateToken` if the value already exists.
    async fn create_token(&self, token: &Token) -> Result<()>;

    /// Fails `TokenNotFound` if absent.
    async fn get_token(&self, value: &str) -> Result<Token>;
}
