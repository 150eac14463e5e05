//! Tollgate Common
//!
//! Types shared by the authentication service and by the services that
//! consume it over the peer transport:
//! - Caller identities and permission names
//! - The standard API error body
//! - The `IdentityValidator` seam and the authorization guard built on it
//! - Tracing initialisation

pub mod api;
pub mod guard;
pub mod logging;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use api::ApiError;
pub use guard::{require_permission, AuthorizationGuard, GuardError, PermissionGate};

/// Header carrying the caller's access token.
pub const AUTH_HEADER: &str = "auth";

/// Permission granted to every new account.
pub const PERMISSION_READ: &str = "read";

/// Permission required to change other users' permissions.
pub const PERMISSION_MANAGE: &str = "manage";

/// A validated caller: who they are and what they may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub username: String,
    #[schema(value_type = Vec<String>)]
    pub permissions: BTreeSet<String>,
}

impl Identity {
    pub fn new<I, S>(username: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Why an access token could not be turned into an `Identity`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Unknown, expired, or wrong-kind token.
    #[error("{reason}")]
    Invalid { reason: String },

    /// The identity source itself failed (storage, transport).
    #[error("Identity source unavailable: {reason}")]
    Unavailable { reason: String },
}

impl IdentityError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}

/// Resolves an access token to the caller's identity.
///
/// Implemented locally by the authentication service and remotely by the
/// gRPC peer client, so the same guard works inside and outside the service.
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    async fn validate(&self, access_token: &str) -> Result<Identity, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_permissions() {
        let identity = Identity::new("alice", ["read", "manage"]);
        assert!(identity.has_permission("manage"));
        assert!(!identity.has_permission("write"));
    }

    #[test]
    fn test_identity_serializes_permissions_as_sorted_list() {
        let identity = Identity::new("alice", ["write", "read"]);
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["permissions"], serde_json::json!(["read", "write"]));
    }
}
