//! Tollgate Peer Transport
//!
//! gRPC surface through which other services validate access tokens:
//! - `AuthRpcService` serves `tollgate.auth.v1.AuthRpc/Validate` over an `AuthService`
//! - `RemoteAuthClient` calls it and implements `IdentityValidator`, so a
//!   remote service can gate its own routes with `AuthorizationGuard`

pub mod client;
pub mod server;

pub use client::{RemoteAuthClient, RpcError};
pub use server::AuthRpcService;

/// Wire messages and generated service stubs.
pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ValidateRequest {
        #[prost(string, tag = "1")]
        pub access_token: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ValidateResponse {
        #[prost(string, tag = "1")]
        pub username: ::prost::alloc::string::String,
        #[prost(string, repeated, tag = "2")]
        pub permissions: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    include!(concat!(env!("OUT_DIR"), "/tollgate.auth.v1.AuthRpc.rs"));
}
