//! Tollgate Authentication Core
//!
//! - User registration with phone confirmation
//! - Password verification (Argon2id on a bounded blocking pool)
//! - Opaque access, refresh, and confirm tokens resolved by lookup
//! - Per-user permission sets
//! - Public HTTP API (the peer gRPC adapter lives in `tg-rpc`)

pub mod domain;
pub mod error;
pub mod store;
pub mod service;
pub mod api;

pub use domain::*;
pub use error::AuthError;
pub use service::{AuthService, PasswordService, TokenIssuer, TokenPair};
