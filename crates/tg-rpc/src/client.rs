//! gRPC client for services that validate tokens remotely.

use async_trait::async_trait;
use thiserror::Error;
use tg_common::{GuardError, Identity, IdentityError, IdentityValidator};
use tonic::transport::Channel;
use tonic::{Code, Status};
use tracing::warn;

use crate::proto::auth_rpc_client::AuthRpcClient;
use crate::proto::ValidateRequest;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Cheap to clone; clones share one HTTP/2 channel.
#[derive(Clone)]
pub struct RemoteAuthClient {
    inner: AuthRpcClient<Channel>,
}

impl RemoteAuthClient {
    /// Connect to the auth service's peer address, e.g. `http://auth:5300`.
    pub async fn connect(address: impl Into<String>) -> Result<Self, RpcError> {
        let inner = AuthRpcClient::connect(address.into()).await?;
        Ok(Self { inner })
    }

    pub fn with_channel(channel: Channel) -> Self {
        Self {
            inner: AuthRpcClient::new(channel),
        }
    }

    pub async fn validate(&self, access_token: &str) -> Result<Identity, IdentityError> {
        let request = ValidateRequest {
            access_token: access_token.to_string(),
        };
        let response = self
            .inner
            .clone()
            .validate(request)
            .await
            .map_err(identity_error)?
            .into_inner();

        Ok(Identity::new(response.username, response.permissions))
    }

    /// Validate and require `permission`.
    pub async fn check_permission(
        &self,
        access_token: &str,
        permission: &str,
    ) -> Result<Identity, GuardError> {
        let identity = self.validate(access_token).await?;
        if identity.has_permission(permission) {
            Ok(identity)
        } else {
            Err(GuardError::Forbidden {
                permission: permission.to_string(),
            })
        }
    }
}

fn identity_error(status: Status) -> IdentityError {
    match status.code() {
        Code::Unauthenticated => IdentityError::invalid(status.message()),
        code => {
            warn!(?code, message = %status.message(), "Auth service call failed");
            IdentityError::unavailable(format!("auth service returned {:?}", code))
        }
    }
}

#[async_trait]
impl IdentityValidator for RemoteAuthClient {
    async fn validate(&self, access_token: &str) -> Result<Identity, IdentityError> {
        RemoteAuthClient::validate(self, access_token).await
    }
}
