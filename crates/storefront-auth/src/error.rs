//! Authentication error types

use storefront_db::DbError;
use thiserror::Error;

/// Failures raised by the hasher, the token service and the guards.
///
/// The display strings double as the client-facing messages; the API layer
/// decides the status code for each variant.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no cookie found")]
    NoSession,

    #[error("no token found")]
    NoToken,

    #[error("Invalid Token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Please login!")]
    Unauthenticated,

    #[error("No user found with this id!")]
    IdentityNotFound,

    #[error("User is not an admin!")]
    Forbidden,

    #[error("Signing secret is not configured")]
    SigningKeyMissing,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] DbError),
}
