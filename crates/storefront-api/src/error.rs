//! API error types
//!
//! Every failure a handler or guard produces ends up here, and
//! [`IntoResponse`] for [`ApiError`] is the only place that picks an HTTP
//! status code.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storefront_auth::AuthError;
use storefront_db::DbError;
use storefront_storage::StorageError;
use thiserror::Error;
use tracing::error;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Message for uploads above the configured image size
pub const FILE_TOO_LARGE: &str = "File size too large!";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Status code and client-facing message for this error
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            ApiError::Internal(_) => internal(),
            ApiError::Auth(e) => auth_status(e),
            ApiError::Database(e) => database_status(e),
            ApiError::Storage(e) => match e {
                StorageError::InvalidPath(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                StorageError::Io(_) => internal(),
            },
        }
    }
}

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
}

fn auth_status(e: &AuthError) -> (StatusCode, String) {
    let status = match e {
        AuthError::NoSession | AuthError::NoToken | AuthError::IdentityNotFound => {
            StatusCode::NOT_FOUND
        }
        AuthError::InvalidToken | AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::ExpiredToken | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::Database(db) => return database_status(db),
        AuthError::SigningKeyMissing | AuthError::PasswordHash(_) | AuthError::Jwt(_) => {
            return internal();
        }
    };
    (status, e.to_string())
}

fn database_status(e: &DbError) -> (StatusCode, String) {
    match e {
        DbError::Duplicate(msg) | DbError::Constraint(msg) => (StatusCode::CONFLICT, msg.clone()),
        DbError::Connection(_) => internal(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

// ==================== Extractor Rejections ====================

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::Validation("Invalid ID".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::Validation(FILE_TOO_LARGE.to_string());
        }
        ApiError::Validation(e.body_text())
    }
}
