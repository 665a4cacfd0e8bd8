//! Category routes

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use storefront_db::NewCategory;
use storefront_db::utils::slugify;
use tracing::info;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::response::ApiResponse;
use crate::state::AppState;

use super::admin_only;
use super::types::{CategoryData, CategoryRequest, CategoryResponse};

/// Maximum allowed category name length
const MAX_CATEGORY_NAME_LENGTH: usize = 64;

/// Validate the requested name and derive its slug
fn category_from_request(request: CategoryRequest) -> Result<NewCategory, ApiError> {
    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Category name is required".to_string()))?;

    if name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Category name exceeds maximum length of {} characters",
            MAX_CATEGORY_NAME_LENGTH
        )));
    }

    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(ApiError::Validation(
            "Category name must contain letters or digits".to_string(),
        ));
    }

    Ok(NewCategory { name, slug })
}

/// POST /api/categories (Admin only)
async fn create_category(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> Result<ApiResponse<CategoryResponse>, ApiError> {
    let category = category_from_request(request)?;

    if state.db.get_category_by_name(&category.name).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Category already exists with name {}.",
            category.name
        )));
    }

    let category = state.db.insert_category(category).await?;
    info!("Created category {} ({})", category.name, category.slug);

    Ok(ApiResponse::created(
        "Category was added successfully!",
        category.into(),
    ))
}

/// GET /api/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<CategoryResponse>>, ApiError> {
    let categories = state.db.list_categories().await?;
    Ok(ApiResponse::ok(
        "All categories returned",
        categories.into_iter().map(CategoryResponse::from).collect(),
    ))
}

/// GET /api/categories/{slug} (Admin only)
async fn get_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<ApiResponse<CategoryData>, ApiError> {
    let category = state
        .db
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category is not found.".to_string()))?;

    Ok(ApiResponse::ok(
        "Category was returned",
        CategoryData {
            category: category.into(),
        },
    ))
}

/// PUT /api/categories/{slug} (Admin only)
async fn update_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> Result<ApiResponse<CategoryData>, ApiError> {
    let update = category_from_request(request)?;

    let category = state
        .db
        .update_category(&slug, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No category found with slug {}", slug)))?;

    info!("Updated category {} -> {}", slug, category.slug);

    Ok(ApiResponse::ok(
        "Category is updated",
        CategoryData {
            category: category.into(),
        },
    ))
}

/// DELETE /api/categories/{slug} (Admin only)
async fn delete_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<ApiResponse, ApiError> {
    if !state.db.delete_category(&slug).await? {
        return Err(ApiError::NotFound("Category is not found.".to_string()));
    }

    info!("Deleted category {}", slug);

    Ok(ApiResponse::message("Category was deleted"))
}

/// Create category routes, mounted under `/api/categories`
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_categories).merge(admin_only(post(create_category), state)),
        )
        .route(
            "/{slug}",
            admin_only(
                get(get_category).put(update_category).delete(delete_category),
                state,
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_request() {
        let category = category_from_request(CategoryRequest {
            name: Some("  Home & Garden ".to_string()),
        })
        .unwrap();
        assert_eq!(category.name, "Home & Garden");
        assert_eq!(category.slug, "home-garden");

        assert!(category_from_request(CategoryRequest { name: None }).is_err());
        assert!(category_from_request(CategoryRequest { name: Some("   ".into()) }).is_err());
        assert!(category_from_request(CategoryRequest { name: Some("!!!".into()) }).is_err());
    }
}
