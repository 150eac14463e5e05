//! OpenAPI Documentation

use utoipa::OpenApi;

use super::auth;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tollgate Auth API",
        version = "1.0.0",
        description = "Registration, sign-in, token validation and permission management"
    ),
    paths(
        auth::sign_up,
        auth::sign_in,
        auth::validate,
        auth::refresh,
        auth::set_permissions,
        auth::confirm,
    ),
    components(schemas(
        auth::SignUpRequest,
        auth::SignInRequest,
        auth::SignInResponse,
        auth::RefreshRequest,
        auth::RefreshResponse,
        auth::SetPermissionsRequest,
        auth::MessageResponse,
        auth::EmptyResponse,
        tg_common::Identity,
        tg_common::ApiError,
    )),
    tags(
        (name = "auth", description = "Authentication and authorization")
    )
)]
pub struct AuthApiDoc;
