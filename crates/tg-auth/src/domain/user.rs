//! User Entity

use std::collections::BTreeSet;
use std::fmt;

use tg_common::{Identity, PERMISSION_READ};

/// Stored account. `phone_confirmed` only ever goes false -> true.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub phone_number: String,
    pub phone_confirmed: bool,
    pub permissions: BTreeSet<String>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .field("phone_confirmed", &self.phone_confirmed)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// Input for `CredentialStore::create_user`.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub phone_number: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            phone_number: phone_number.into(),
        }
    }

    /// The stored form of a freshly registered account.
    pub fn into_user(self) -> User {
        User {
            username: self.username,
            password_hash: self.password_hash,
            phone_number: self.phone_number,
            phone_confirmed: false,
            permissions: default_permissions(),
        }
    }
}

/// Permissions granted at sign-up.
pub fn default_permissions() -> BTreeSet<String> {
    BTreeSet::from([PERMISSION_READ.to_string()])
}
