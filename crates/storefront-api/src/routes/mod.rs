//! API routes

mod categories;
mod health;
mod products;
pub mod types;
mod users;

use axum::{
    Router,
    handler::HandlerWithoutStateExt,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::MethodRouter,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::error::ApiError;
use crate::middleware::{auth_guard, require_admin};
use crate::state::AppState;

/// Guard a method router with the session check
pub(crate) fn authed(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), auth_guard))
}

/// Guard a method router with the session check followed by the admin check
///
/// The layer added last runs first, so `auth_guard` wraps `require_admin`.
pub(crate) fn admin_only(
    route: MethodRouter<AppState>,
    state: &AppState,
) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), auth_guard))
}

/// Fallback for unmatched routes
async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found!".to_string())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let router = Router::new()
        .merge(health::routes())
        .nest("/api/users", users::routes(&state))
        .nest("/api/categories", categories::routes(&state))
        .nest("/api/products", products::routes(&state))
        .nest_service(
            "/images/products",
            ServeDir::new(&settings.image_dir).not_found_service(route_not_found.into_service()),
        )
        .method_not_allowed_fallback(route_not_found)
        .fallback(route_not_found)
        .with_state(state);

    if settings.cors_origins.is_empty() {
        router
    } else {
        router.layer(cors_layer(&settings.cors_origins))
    }
}
