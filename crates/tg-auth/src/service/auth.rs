//! Authentication Service
//!
//! The state machine core. Every adapter (HTTP, gRPC, the guard) goes
//! through these operations; none of them touch the stores directly.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tg_common::{Identity, IdentityError, IdentityValidator, PERMISSION_MANAGE};
use tg_notify::NotificationDispatcher;
use tracing::{debug, info, warn};

use super::{PasswordService, TokenIssuer};
use crate::domain::{NewUser, Token, TokenKind};
use crate::error::{AuthError, Result};
use crate::store::{CredentialStore, TokenStore};

/// Returned by `sign_up` once the confirmation link is on its way.
pub const CONFIRMATION_SENT: &str = "We sent the confirmation link to your phone.";

/// Returned by `confirm`.
pub const REGISTRATION_CONFIRMED: &str = "Registration has been successfully confirmed";

/// Credentials returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub refresh_token: Token,
    pub access_token: Token,
}

pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenStore>,
    issuer: TokenIssuer,
    passwords: PasswordService,
    notifier: Arc<dyn NotificationDispatcher>,
    confirm_base_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
        issuer: TokenIssuer,
        passwords: PasswordService,
        notifier: Arc<dyn NotificationDispatcher>,
        confirm_base_url: impl Into<String>,
    ) -> Self {
        let confirm_base_url: String = confirm_base_url.into();
        Self {
            users,
            tokens,
            issuer,
            passwords,
            notifier,
            confirm_base_url: confirm_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Register an unconfirmed account and text it a confirmation link.
    ///
    /// A store or dispatch failure after the user row is written surfaces
    /// as an error; the row stays.
    pub async fn sign_up(&self, username: &str, password: &str, phone_number: &str) -> Result<String> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::bad_request("username and password are required"));
        }

        let password_hash = self.passwords.hash_password(password.to_string()).await?;
        self.users
            .create_user(&NewUser::new(username, password_hash, phone_number))
            .await?;
        info!(username = %username, "User registered");

        self.send_confirmation(username, phone_number).await?;
        Ok(CONFIRMATION_SENT.to_string())
    }

    /// Exchange a password for a refresh/access pair.
    ///
    /// Unconfirmed accounts get a fresh confirmation link instead.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = match self.users.get_user(username).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound { .. }) => {
                // Unknown users pay one verification too.
                self.passwords.verify_decoy(password.to_string()).await?;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let valid = self
            .passwords
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?;
        if !valid {
            debug!(username = %username, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.phone_confirmed {
            self.send_confirmation(&user.username, &user.phone_number).await?;
            return Err(AuthError::PhoneNotConfirmed);
        }

        let refresh_token = self.issue(TokenKind::Refresh, &user.username).await?;
        let access_token = self.issue(TokenKind::Access, &user.username).await?;
        info!(username = %user.username, "User signed in");

        Ok(TokenPair {
            refresh_token,
            access_token,
        })
    }

    /// Mint a new access token. The refresh token stays valid.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let token = self.resolve(refresh_token, TokenKind::Refresh).await?;
        self.issue(TokenKind::Access, &token.username).await
    }

    /// Mark the token owner's phone confirmed. Repeating it is harmless.
    pub async fn confirm(&self, confirm_token: &str) -> Result<String> {
        let token = self.resolve(confirm_token, TokenKind::Confirm).await?;
        self.users.confirm_phone(&token.username).await?;
        info!(username = %token.username, "Phone confirmed");
        Ok(REGISTRATION_CONFIRMED.to_string())
    }

    pub async fn validate(&self, access_token: &str) -> Result<Identity> {
        let token = self.resolve(access_token, TokenKind::Access).await?;
        let user = match self.users.get_user(&token.username).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound { .. }) => {
                warn!(username = %token.username, "Access token owner no longer exists");
                return Err(AuthError::TokenNotFound);
            }
            Err(e) => return Err(e),
        };
        Ok(user.identity())
    }

    /// Replace `target`'s permissions on behalf of the holder of `caller_token`.
    pub async fn set_permissions(
        &self,
        caller_token: &str,
        target: &str,
        permissions: BTreeSet<String>,
    ) -> Result<()> {
        let caller = self.validate(caller_token).await?;
        self.apply_permissions(&caller, target, permissions).await
    }

    /// Same as `set_permissions` for a caller already validated upstream.
    pub async fn apply_permissions(
        &self,
        caller: &Identity,
        target: &str,
        permissions: BTreeSet<String>,
    ) -> Result<()> {
        if !caller.has_permission(PERMISSION_MANAGE) {
            return Err(AuthError::InsufficientPermission {
                permission: PERMISSION_MANAGE.to_string(),
            });
        }

        self.users.set_permissions(target, &permissions).await?;
        info!(
            caller = %caller.username,
            target = %target,
            permissions = ?permissions,
            "Permissions updated"
        );
        Ok(())
    }

    /// Look up `value` and check it is a live token of `expected` kind.
    /// Kind is checked before expiry.
    async fn resolve(&self, value: &str, expected: TokenKind) -> Result<Token> {
        let token = self.tokens.get_token(value).await?;

        if token.kind != expected {
            debug!(expected = %expected, actual = %token.kind, "Token kind mismatch");
            return Err(AuthError::TokenTypeMismatch {
                expected,
                actual: token.kind,
            });
        }

        if token.is_expired_at(Utc::now()) {
            debug!(kind = %token.kind, username = %token.username, "Token expired");
            return Err(AuthError::TokenExpired);
        }

        Ok(token)
    }

    async fn issue(&self, kind: TokenKind, username: &str) -> Result<Token> {
        let token = self.issuer.issue(kind, username, Utc::now());
        self.tokens.create_token(&token).await?;
        debug!(kind = %kind, username = %username, "Token issued");
        Ok(token)
    }

    async fn send_confirmation(&self, username: &str, phone_number: &str) -> Result<()> {
        let token = self.issue(TokenKind::Confirm, username).await?;
        let text = format!(
            "To confirm registration follow the link: {}/{}",
            self.confirm_base_url, token.value
        );
        self.notifier.send(phone_number, &text).await?;
        debug!(username = %username, dispatcher = %self.notifier.name(), "Confirmation dispatched");
        Ok(())
    }
}

#[async_trait]
impl IdentityValidator for AuthService {
    async fn validate(&self, access_token: &str) -> std::result::Result<Identity, IdentityError> {
        AuthService::validate(self, access_token)
            .await
            .map_err(IdentityError::from)
    }
}
