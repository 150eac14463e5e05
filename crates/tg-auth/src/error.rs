//! Authentication Error Types

use thiserror::Error;
use tg_common::IdentityError;

use crate::domain::TokenKind;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User with this username already exists")]
    DuplicateUser { username: String },

    #[error("User not found")]
    UserNotFound { username: String },

    /// Unknown username and wrong password are deliberately indistinguishable.
    #[error("Username or password is not valid")]
    InvalidCredentials,

    #[error("Your phone number is not confirmed. Follow the link in the sms")]
    PhoneNotConfirmed,

    #[error("Token is not valid")]
    TokenNotFound,

    #[error("Should provide {expected} token")]
    TokenTypeMismatch { expected: TokenKind, actual: TokenKind },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token value collision")]
    DuplicateToken,

    #[error("Not enough permissions: {permission} required")]
    InsufficientPermission { permission: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Dispatch failure: {0}")]
    Dispatch(#[from] tg_notify::NotifyError),

    #[error("Password hashing failed: {message}")]
    Hashing { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl AuthError {
    pub fn duplicate_user(username: impl Into<String>) -> Self {
        Self::DuplicateUser { username: username.into() }
    }

    pub fn user_not_found(username: impl Into<String>) -> Self {
        Self::UserNotFound { username: username.into() }
    }

    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing { message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Stable machine-readable code for API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::DuplicateUser { .. } => "DUPLICATE_USER",
            AuthError::UserNotFound { .. } => "USER_NOT_FOUND",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::PhoneNotConfirmed => "PHONE_NOT_CONFIRMED",
            AuthError::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthError::TokenTypeMismatch { .. } => "TOKEN_TYPE_MISMATCH",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::DuplicateToken => "DUPLICATE_TOKEN",
            AuthError::InsufficientPermission { .. } => "FORBIDDEN",
            AuthError::Storage(_) => "STORAGE_FAILURE",
            AuthError::Dispatch(_) => "DISPATCH_FAILURE",
            AuthError::Hashing { .. } => "INTERNAL_ERROR",
            AuthError::BadRequest { .. } => "BAD_REQUEST",
        }
    }

    /// Whether this is a token that failed to resolve to a valid credential.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::TokenNotFound | AuthError::TokenExpired | AuthError::TokenTypeMismatch { .. }
        )
    }
}

impl From<AuthError> for IdentityError {
    fn from(err: AuthError) -> Self {
        if err.is_token_rejection() {
            IdentityError::invalid(err.to_string())
        } else {
            IdentityError::unavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
