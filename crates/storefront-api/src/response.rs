//! Success envelope

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Placeholder payload that serializes as `{}`
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

/// `{ success: true, message, data }` with a handler-chosen status
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = Empty> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    message: String,
    data: T,
}

impl ApiResponse<Empty> {
    /// 200 response carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(message, Empty {})
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::ok(message, data).with_status(StatusCode::CREATED)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::message("logout successful!")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": true, "message": "logout successful!", "data": {} })
        );
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created("Category was added successfully!", Empty {});
        assert_eq!(response.into_response().status(), StatusCode::CREATED);
    }
}
