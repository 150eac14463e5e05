//! Domain Models
//!
//! Users keyed by username and tokens keyed by their opaque value.

pub mod token;
pub mod user;

pub use token::*;
pub use user::*;
