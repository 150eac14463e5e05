//! Public HTTP API

pub mod auth;
pub mod error;
pub mod openapi;

pub use auth::{auth_router, AuthState};
pub use error::{ApiFailure, Endpoint};
pub use openapi::AuthApiDoc;
