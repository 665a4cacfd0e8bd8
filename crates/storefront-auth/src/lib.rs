//! Storefront Authentication and Authorization
//!
//! This crate provides password hashing, signed tokens, the cookie
//! session channel and the guard decisions used by the HTTP layer.

pub mod error;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod session;

pub use error::AuthError;
pub use guard::{SessionUser, authenticate, authorize_admin};
pub use jwt::{PendingRegistration, PendingReset, TokenClaims, TokenSigner, TokenTtls};
pub use password::{hash_password, verify_password};
pub use session::{clear_session_cookie, parse_cookies, set_session_cookie};
