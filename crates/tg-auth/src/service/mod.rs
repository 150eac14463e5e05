//! Service Layer
//!
//! Business logic over the stores: password hashing, token issuance, and
//! the authentication state machine.

pub mod auth;
pub mod issuer;
pub mod password;

pub use auth::{AuthService, TokenPair, CONFIRMATION_SENT, REGISTRATION_CONFIRMED};
pub use issuer::TokenIssuer;
pub use password::{Argon2Config, PasswordService};
