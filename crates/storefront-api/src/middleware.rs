//! Request guards
//!
//! `auth_guard` binds a [`SessionUser`] to the request extensions and
//! `require_admin` consumes it; they are layered so that the auth guard
//! always runs first.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use storefront_auth::{SessionUser, authenticate, authorize_admin};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Require a valid session cookie
pub async fn auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(request.headers(), &state.session_tokens)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Require the bound identity to be an admin
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = request.extensions().get::<SessionUser>().copied();
    let admin = authorize_admin(&state.db, session.as_ref()).await?;
    debug!("Admin access granted to identity {}", admin.id);
    Ok(next.run(request).await)
}

/// Reject clients that exceed the request budget
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.allow(&client) {
        warn!("Rate limit exceeded for {}", client);
        return Err(ApiError::TooManyRequests(
            "Too many requests, please try again later.".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
