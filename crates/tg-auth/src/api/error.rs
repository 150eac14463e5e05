//! HTTP error mapping
//!
//! The same `AuthError` can mean different things on different routes
//! (an unknown token is 403 on refresh but 401 on confirm), so the status is
//! chosen per endpoint.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tg_common::{ApiError, GuardError};
use tracing::error;

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SignUp,
    SignIn,
    Validate,
    Refresh,
    SetPermissions,
    Confirm,
}

impl Endpoint {
    pub fn status(self, err: &AuthError) -> StatusCode {
        use AuthError::*;
        use Endpoint::*;

        match (self, err) {
            (_, BadRequest { .. }) => StatusCode::BAD_REQUEST,

            (SignUp, DuplicateUser { .. }) => StatusCode::BAD_REQUEST,

            (SignIn, InvalidCredentials) => StatusCode::UNAUTHORIZED,
            (SignIn, PhoneNotConfirmed) => StatusCode::FORBIDDEN,

            (Validate, TokenNotFound | TokenExpired | TokenTypeMismatch { .. }) => {
                StatusCode::UNAUTHORIZED
            }

            (Refresh, TokenNotFound | TokenExpired) => StatusCode::FORBIDDEN,
            (Refresh, TokenTypeMismatch { .. }) => StatusCode::BAD_REQUEST,

            (SetPermissions, TokenNotFound | TokenExpired | TokenTypeMismatch { .. }) => {
                StatusCode::UNAUTHORIZED
            }
            (SetPermissions, InsufficientPermission { .. }) => StatusCode::FORBIDDEN,
            (SetPermissions, UserNotFound { .. }) => StatusCode::BAD_REQUEST,

            (Confirm, TokenNotFound | TokenExpired) => StatusCode::UNAUTHORIZED,
            (Confirm, TokenTypeMismatch { .. }) => StatusCode::BAD_REQUEST,

            (
                _,
                DuplicateUser { .. }
                | UserNotFound { .. }
                | InvalidCredentials
                | PhoneNotConfirmed
                | TokenNotFound
                | TokenTypeMismatch { .. }
                | TokenExpired
                | DuplicateToken
                | InsufficientPermission { .. }
                | Storage(_)
                | Dispatch(_)
                | Hashing { .. },
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Rendered error response for a public route.
#[derive(Debug)]
pub struct ApiFailure(Response);

impl ApiFailure {
    pub fn new(endpoint: Endpoint, err: AuthError) -> Self {
        let status = endpoint.status(&err);
        let body = if status.is_server_error() {
            error!(endpoint = ?endpoint, error = %err, "Request failed");
            ApiError::internal()
        } else {
            ApiError::new(err.code(), err.to_string())
        };
        Self(body.with_status(status))
    }

    pub fn malformed(rejection: JsonRejection) -> Self {
        Self(ApiError::new("BAD_REQUEST", rejection.body_text()).with_status(StatusCode::BAD_REQUEST))
    }
}

impl From<GuardError> for ApiFailure {
    fn from(err: GuardError) -> Self {
        Self(err.into_response())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TokenKind;

    fn mismatch() -> AuthError {
        AuthError::TokenTypeMismatch {
            expected: TokenKind::Access,
            actual: TokenKind::Refresh,
        }
    }

    #[test]
    fn test_unknown_token_status_depends_on_route() {
        assert_eq!(Endpoint::Validate.status(&AuthError::TokenNotFound), StatusCode::UNAUTHORIZED);
        assert_eq!(Endpoint::Refresh.status(&AuthError::TokenNotFound), StatusCode::FORBIDDEN);
        assert_eq!(Endpoint::Confirm.status(&AuthError::TokenNotFound), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_wrong_kind_status() {
        assert_eq!(Endpoint::Validate.status(&mismatch()), StatusCode::UNAUTHORIZED);
        assert_eq!(Endpoint::Refresh.status(&mismatch()), StatusCode::BAD_REQUEST);
        assert_eq!(Endpoint::Confirm.status(&mismatch()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_failures_are_500() {
        for endpoint in [Endpoint::SignUp, Endpoint::SignIn, Endpoint::Validate, Endpoint::Confirm] {
            assert_eq!(
                endpoint.status(&AuthError::Storage(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR
            );
            assert_eq!(
                endpoint.status(&AuthError::hashing("boom")),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_set_permissions_mapping() {
        assert_eq!(
            Endpoint::SetPermissions.status(&AuthError::InsufficientPermission {
                permission: "manage".to_string()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Endpoint::SetPermissions.status(&AuthError::user_not_found("ghost")),
            StatusCode::BAD_REQUEST
        );
    }
}
