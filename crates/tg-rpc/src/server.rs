//! gRPC server side of identity validation.

use std::sync::Arc;

use tg_auth::{AuthError, AuthService};
use tonic::{Request, Response, Status};
use tracing::{debug, error};

use crate::proto::auth_rpc_server::{AuthRpc, AuthRpcServer};
use crate::proto::{ValidateRequest, ValidateResponse};

#[derive(Clone)]
pub struct AuthRpcService {
    auth_service: Arc<AuthService>,
}

impl AuthRpcService {
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        Self { auth_service }
    }

    /// Wrap in the generated tonic server, ready for `add_service`.
    pub fn into_server(self) -> AuthRpcServer<Self> {
        AuthRpcServer::new(self)
    }
}

fn status_for(err: AuthError) -> Status {
    if err.is_token_rejection() {
        Status::unauthenticated(err.to_string())
    } else {
        error!(error = %err, "Peer validation failed");
        Status::internal("internal error")
    }
}

#[tonic::async_trait]
impl AuthRpc for AuthRpcService {
    async fn validate(
        &self,
        request: Request<ValidateRequest>,
    ) -> Result<Response<ValidateResponse>, Status> {
        let req = request.into_inner();
        let identity = self
            .auth_service
            .validate(&req.access_token)
            .await
            .map_err(status_for)?;

        debug!(username = %identity.username, "Peer validated token");
        Ok(Response::new(ValidateResponse {
            username: identity.username,
            permissions: identity.permissions.into_iter().collect(),
        }))
    }
}
