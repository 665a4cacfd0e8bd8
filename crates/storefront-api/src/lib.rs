//! Storefront REST API
//!
//! This crate provides the Axum-based HTTP API: account management with
//! cookie sessions, the product catalog and its categories.

pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use mail::{Email, LogMailer, Mailer};
pub use rate_limit::RateLimiter;
pub use response::ApiResponse;
pub use routes::create_router;
pub use state::{AppSettings, AppState};
