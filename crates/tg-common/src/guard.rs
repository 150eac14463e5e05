//! Authorization Guard
//!
//! Gates privileged operations by permission name. The caller's access token
//! is read from the `auth` header and resolved through an `IdentityValidator`:
//! - validation failure -> 401
//! - permission missing -> 403
//! - validator unavailable -> 500 (no internal detail)

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{ApiError, Identity, IdentityError, IdentityValidator, AUTH_HEADER};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not enough permissions: {permission} required")]
    Forbidden { permission: String },

    #[error("Identity source unavailable")]
    Unavailable,
}

impl From<IdentityError> for GuardError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Invalid { reason } => GuardError::Unauthorized(reason),
            IdentityError::Unavailable { reason } => {
                error!(%reason, "Identity validation failed upstream");
                GuardError::Unavailable
            }
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            GuardError::Unauthorized(reason) => {
                ApiError::new("UNAUTHORIZED", reason).with_status(StatusCode::UNAUTHORIZED)
            }
            GuardError::Forbidden { .. } => {
                ApiError::new("FORBIDDEN", self.to_string()).with_status(StatusCode::FORBIDDEN)
            }
            GuardError::Unavailable => {
                ApiError::internal().with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Reusable permission check over any identity source.
#[derive(Clone)]
pub struct AuthorizationGuard {
    validator: Arc<dyn IdentityValidator>,
}

impl AuthorizationGuard {
    pub fn new(validator: Arc<dyn IdentityValidator>) -> Self {
        Self { validator }
    }

    /// Access token from the `auth` header, if present and readable.
    pub fn access_token(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Resolve the caller without checking any permission.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, GuardError> {
        let token = Self::access_token(headers)
            .ok_or_else(|| GuardError::Unauthorized("Missing auth header".to_string()))?;
        Ok(self.validator.validate(token).await?)
    }

    /// Resolve the caller and require `permission` in their permission set.
    pub async fn require(&self, headers: &HeaderMap, permission: &str) -> Result<Identity, GuardError> {
        let identity = self.authenticate(headers).await?;
        if identity.has_permission(permission) {
            debug!(username = %identity.username, permission, "Permission granted");
            Ok(identity)
        } else {
            warn!(username = %identity.username, permission, "Permission denied");
            Err(GuardError::Forbidden {
                permission: permission.to_string(),
            })
        }
    }
}

/// State for the `require_permission` middleware.
#[derive(Clone)]
pub struct PermissionGate {
    pub guard: AuthorizationGuard,
    pub permission: &'static str,
}

impl PermissionGate {
    pub fn new(guard: AuthorizationGuard, permission: &'static str) -> Self {
        Self { guard, permission }
    }
}

/// Axum middleware gating a router on one permission.
///
/// On success the caller's `Identity` is inserted into the request
/// extensions for handlers to pick up with `Extension<Identity>`.
///
/// ```ignore
/// let gate = PermissionGate::new(guard, "write");
/// Router::new()
///     .route("/items", post(create_item))
///     .route_layer(axum::middleware::from_fn_with_state(gate, require_permission));
/// ```
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.guard.require(request.headers(), gate.permission).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::Body, routing::get, Extension, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct StaticValidator;

    #[async_trait]
    impl IdentityValidator for StaticValidator {
        async fn validate(&self, access_token: &str) -> Result<Identity, IdentityError> {
            match access_token {
                "admin-token" => Ok(Identity::new("root", ["read", "manage"])),
                "reader-token" => Ok(Identity::new("bob", ["read"])),
                "broken-token" => Err(IdentityError::unavailable("connection refused")),
                _ => Err(IdentityError::invalid("Token is not valid")),
            }
        }
    }

    fn guard() -> AuthorizationGuard {
        AuthorizationGuard::new(Arc::new(StaticValidator))
    }

    fn headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, token.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_require_grants_with_permission() {
        let identity = guard().require(&headers("admin-token"), "manage").await.unwrap();
        assert_eq!(identity.username, "root");
    }

    #[tokio::test]
    async fn test_require_forbids_without_permission() {
        let err = guard().require(&headers("reader-token"), "manage").await.unwrap_err();
        assert_eq!(err, GuardError::Forbidden { permission: "manage".to_string() });
    }

    #[tokio::test]
    async fn test_invalid_or_missing_token_is_unauthorized() {
        let err = guard().require(&headers("nope"), "read").await.unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized(_)));

        let err = guard().require(&HeaderMap::new(), "read").await.unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_unavailable_validator_hides_detail() {
        let err = guard().require(&headers("broken-token"), "read").await.unwrap_err();
        assert_eq!(err, GuardError::Unavailable);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_middleware_status_codes() {
        async fn whoami(Extension(identity): Extension<Identity>) -> String {
            identity.username
        }

        let app = Router::new()
            .route("/private", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(
                PermissionGate::new(guard(), "manage"),
                require_permission,
            ));

        let cases = [
            (Some("admin-token"), StatusCode::OK),
            (Some("reader-token"), StatusCode::FORBIDDEN),
            (Some("garbage"), StatusCode::UNAUTHORIZED),
            (None, StatusCode::UNAUTHORIZED),
        ];

        for (token, expected) in cases {
            let mut builder = axum::http::Request::builder().uri("/private");
            if let Some(token) = token {
                builder = builder.header(AUTH_HEADER, token);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "token {:?}", token);
        }
    }
}
