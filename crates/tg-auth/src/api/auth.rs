//! Auth API Endpoints
//!
//! - POST /signup - Register and receive a confirmation link by SMS
//! - POST /signin - Exchange a password for refresh and access tokens
//! - GET /validate - Resolve the `auth` header to an identity
//! - PUT /refresh - Mint a new access token
//! - PUT /set_permissions - Replace a user's permissions (requires `manage`)
//! - GET /confirm/{token} - Confirm the phone number

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tg_common::{AuthorizationGuard, GuardError, Identity, PERMISSION_MANAGE};
use utoipa::ToSchema;

use super::error::{ApiFailure, Endpoint};
use crate::service::AuthService;

/// Sign-up request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub phone_number: String,
}

/// Sign-in request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// Sign-in response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    pub refresh_token: String,
    pub access_token: String,
}

/// Refresh request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Permission update request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPermissionsRequest {
    /// Account whose permissions are replaced
    pub username: String,
    /// Complete new permission set
    pub permissions: Vec<String>,
}

/// Human-readable outcome
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Empty JSON object
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct EmptyResponse {}

/// Auth API state
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub guard: AuthorizationGuard,
}

impl AuthState {
    /// State whose guard validates against `auth_service` itself.
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        let guard = AuthorizationGuard::new(auth_service.clone());
        Self { auth_service, guard }
    }
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Confirmation link sent", body = MessageResponse),
        (status = 400, description = "Username taken or malformed body", body = tg_common::ApiError),
        (status = 500, description = "Internal error", body = tg_common::ApiError)
    )
)]
pub async fn sign_up(
    State(state): State<AuthState>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    let Json(req) = body.map_err(ApiFailure::malformed)?;
    let message = state
        .auth_service
        .sign_up(&req.username, &req.password, &req.phone_number)
        .await
        .map_err(|e| ApiFailure::new(Endpoint::SignUp, e))?;
    Ok(Json(MessageResponse { message }))
}

/// Sign in with username and password
#[utoipa::path(
    post,
    path = "/signin",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials", body = tg_common::ApiError),
        (status = 403, description = "Phone not confirmed; a new link was sent", body = tg_common::ApiError)
    )
)]
pub async fn sign_in(
    State(state): State<AuthState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, ApiFailure> {
    let Json(req) = body.map_err(ApiFailure::malformed)?;
    let pair = state
        .auth_service
        .sign_in(&req.username, &req.password)
        .await
        .map_err(|e| ApiFailure::new(Endpoint::SignIn, e))?;
    Ok(Json(SignInResponse {
        refresh_token: pair.refresh_token.value,
        access_token: pair.access_token.value,
    }))
}

/// Resolve the caller's access token
#[utoipa::path(
    get,
    path = "/validate",
    tag = "auth",
    params(("auth" = String, Header, description = "Access token")),
    responses(
        (status = 200, description = "Token is valid", body = Identity),
        (status = 401, description = "Missing, unknown, expired, or wrong-kind token", body = tg_common::ApiError)
    )
)]
pub async fn validate(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<Identity>, ApiFailure> {
    let token = AuthorizationGuard::access_token(&headers)
        .ok_or_else(|| GuardError::Unauthorized("Should provide access token".to_string()))?;
    let identity = state
        .auth_service
        .validate(token)
        .await
        .map_err(|e| ApiFailure::new(Endpoint::Validate, e))?;
    Ok(Json(identity))
}

/// Mint a new access token from a refresh token
#[utoipa::path(
    put,
    path = "/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 400, description = "Not a refresh token", body = tg_common::ApiError),
        (status = 403, description = "Unknown or expired token", body = tg_common::ApiError)
    )
)]
pub async fn refresh(
    State(state): State<AuthState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiFailure> {
    let Json(req) = body.map_err(ApiFailure::malformed)?;
    let token = state
        .auth_service
        .refresh(&req.refresh_token)
        .await
        .map_err(|e| ApiFailure::new(Endpoint::Refresh, e))?;
    Ok(Json(RefreshResponse {
        access_token: token.value,
    }))
}

/// Replace another user's permissions
#[utoipa::path(
    put,
    path = "/set_permissions",
    tag = "auth",
    params(("auth" = String, Header, description = "Access token of a `manage` holder")),
    request_body = SetPermissionsRequest,
    responses(
        (status = 200, description = "Permissions replaced", body = EmptyResponse),
        (status = 400, description = "Unknown user or malformed body", body = tg_common::ApiError),
        (status = 401, description = "Caller token invalid", body = tg_common::ApiError),
        (status = 403, description = "Caller lacks `manage`", body = tg_common::ApiError)
    )
)]
pub async fn set_permissions(
    State(state): State<AuthState>,
    headers: HeaderMap,
    body: Result<Json<SetPermissionsRequest>, JsonRejection>,
) -> Result<Json<EmptyResponse>, ApiFailure> {
    let caller = state.guard.require(&headers, PERMISSION_MANAGE).await?;
    let Json(req) = body.map_err(ApiFailure::malformed)?;

    let permissions: BTreeSet<String> = req.permissions.into_iter().collect();
    state
        .auth_service
        .apply_permissions(&caller, &req.username, permissions)
        .await
        .map_err(|e| ApiFailure::new(Endpoint::SetPermissions, e))?;
    Ok(Json(EmptyResponse {}))
}

/// Confirm a phone number via the link sent by SMS
#[utoipa::path(
    get,
    path = "/confirm/{token}",
    tag = "auth",
    params(("token" = String, Path, description = "Confirmation token")),
    responses(
        (status = 200, description = "Registration confirmed", body = MessageResponse),
        (status = 400, description = "Not a confirmation token", body = tg_common::ApiError),
        (status = 401, description = "Unknown or expired token", body = tg_common::ApiError)
    )
)]
pub async fn confirm(
    State(state): State<AuthState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    let message = state
        .auth_service
        .confirm(&token)
        .await
        .map_err(|e| ApiFailure::new(Endpoint::Confirm, e))?;
    Ok(Json(MessageResponse { message }))
}

/// Create auth router
pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/validate", get(validate))
        .route("/refresh", put(refresh))
        .route("/set_permissions", put(set_permissions))
        .route("/confirm/:token", get(confirm))
        .with_state(state)
}
