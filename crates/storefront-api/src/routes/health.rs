//! Health check endpoints

use axum::{Json, Router, routing::get};
use serde::Serialize;
use serde_json::{Value, json};

use crate::state::AppState;

/// Health status response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /
async fn root() -> Json<Value> {
    Json(json!({ "message": "Testing Successful!" }))
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}
