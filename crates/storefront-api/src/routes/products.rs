//! Product catalog routes

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    routing::{delete, get, post, put},
};
use bytes::Bytes;
use storefront_db::{NewProduct, Page, ProductFilter, UpdateProduct};
use tracing::{debug, info, warn};

use crate::error::{ApiError, FILE_TOO_LARGE};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

use super::admin_only;
use super::types::{
    FilterRequest, PaginationQuery, ProductData, ProductResponse, ProductsData, SearchQuery,
};

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 200;
const MIN_DESCRIPTION_LENGTH: usize = 3;
const DEFAULT_PRODUCTS_PER_PAGE: i64 = 3;

/// Room for the non-file form fields on top of the image itself
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

// ==================== Multipart Form ====================

/// Uploaded image waiting to be stored
struct ImageUpload {
    file_name: String,
    data: Bytes,
}

/// Raw product form fields, as sent by the client
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    brand: Option<String>,
    price: Option<String>,
    category: Option<String>,
    count_in_stock: Option<String>,
    rating: Option<String>,
    num_reviews: Option<String>,
    image: Option<ImageUpload>,
}

async fn read_product_form(
    multipart: Result<Multipart, MultipartRejection>,
    max_image_bytes: usize,
) -> Result<ProductForm, ApiError> {
    let mut multipart = multipart?;
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name == "image" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let data = field.bytes().await?;
            if data.len() > max_image_bytes {
                return Err(ApiError::Validation(FILE_TOO_LARGE.to_string()));
            }
            if !data.is_empty() {
                form.image = Some(ImageUpload { file_name, data });
            }
            continue;
        }

        let value = field.text().await?.trim().to_string();
        let value = (!value.is_empty()).then_some(value);
        match field_name.as_str() {
            "name" => form.name = value,
            "description" => form.description = value,
            "brand" => form.brand = value,
            "price" => form.price = value,
            "category" => form.category = value,
            "countInStock" => form.count_in_stock = value,
            "rating" => form.rating = value,
            "numReviews" => form.num_reviews = value,
            other => debug!("Ignoring unknown product field {}", other),
        }
    }

    Ok(form)
}

// ==================== Field Validation ====================

fn validate_name(name: &str) -> Result<(), ApiError> {
    let len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return Err(ApiError::Validation(format!(
            "Product name should be between {} to {} characters long",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.chars().count() < MIN_DESCRIPTION_LENGTH {
        return Err(ApiError::Validation(format!(
            "Product Description should be minimum {} characters long.",
            MIN_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

fn parse_price(raw: &str) -> Result<f64, ApiError> {
    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() && price > 0.0 => Ok(price),
        _ => Err(ApiError::Validation("Price must be a positive number".to_string())),
    }
}

fn parse_count(raw: &str, field: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(count) if count >= 0 => Ok(count),
        _ => Err(ApiError::Validation(format!(
            "{} must be a non-negative integer",
            field
        ))),
    }
}

fn parse_rating(raw: &str) -> Result<f64, ApiError> {
    match raw.parse::<f64>() {
        Ok(rating) if (0.0..=5.0).contains(&rating) => Ok(rating),
        _ => Err(ApiError::Validation("Rating must be between 0 and 5".to_string())),
    }
}

/// Parse a category id and make sure it exists
async fn resolve_category(state: &AppState, raw: &str) -> Result<i64, ApiError> {
    let id = raw
        .parse::<i64>()
        .map_err(|_| ApiError::Validation(format!("Invalid category id {}", raw)))?;
    if !state.db.category_exists(id).await? {
        return Err(ApiError::Validation(format!("No category found with id {}", id)));
    }
    Ok(id)
}

/// Fail when another product already uses `name`
async fn ensure_unique_name(
    state: &AppState,
    name: &str,
    except_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(existing) = state.db.get_product_by_name(name).await? {
        if Some(existing.id) != except_id {
            return Err(ApiError::Conflict(format!(
                "Product already exists with name {}.",
                name
            )));
        }
    }
    Ok(())
}

async fn remove_image(state: &AppState, path: &str) {
    if let Err(e) = state.images.delete(path).await {
        warn!("Failed to remove product image {}: {}", path, e);
    }
}

// ==================== Product Routes ====================

/// POST /api/products (Admin only)
async fn create_product(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    let form = read_product_form(multipart, state.settings.max_image_bytes).await?;

    let missing = || ApiError::Validation("Please enter all fields!".to_string());
    let name = form.name.ok_or_else(missing)?;
    let description = form.description.ok_or_else(missing)?;
    let brand = form.brand.ok_or_else(missing)?;
    let raw_category = form.category.ok_or_else(missing)?;
    let image = form.image.ok_or_else(missing)?;
    let price = form
        .price
        .ok_or_else(|| ApiError::Validation("Price is required".to_string()))?;
    let count_in_stock = form
        .count_in_stock
        .ok_or_else(|| ApiError::Validation("countInStock is required".to_string()))?;

    validate_name(&name)?;
    validate_description(&description)?;
    let price = parse_price(&price)?;
    let count_in_stock = parse_count(&count_in_stock, "countInStock")?;
    let rating = form.rating.as_deref().map(parse_rating).transpose()?.unwrap_or(0.0);
    let num_reviews = form
        .num_reviews
        .as_deref()
        .map(|raw| parse_count(raw, "numReviews"))
        .transpose()?
        .unwrap_or(0);
    let category_id = resolve_category(&state, &raw_category).await?;
    ensure_unique_name(&state, &name, None).await?;

    let image_path = state.images.store(&image.file_name, image.data).await?;

    let product = match state
        .db
        .insert_product(NewProduct {
            name,
            image: image_path.clone(),
            brand,
            description,
            rating,
            num_reviews,
            price,
            count_in_stock,
            category_id,
        })
        .await
    {
        Ok(product) => product,
        Err(e) => {
            remove_image(&state, &image_path).await;
            return Err(e.into());
        }
    };

    info!("Created product {} ({})", product.id, product.name);

    Ok(ApiResponse::created(
        "Product was added successfully!",
        product.into(),
    ))
}

/// PUT /api/products/updateproduct/{id} (Admin only)
async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ProductData>, ApiError> {
    let form = read_product_form(multipart, state.settings.max_image_bytes).await?;

    let existing = state
        .db
        .get_product_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product found with id {}", id)))?;

    let mut update = UpdateProduct::default();
    if let Some(name) = form.name {
        validate_name(&name)?;
        ensure_unique_name(&state, &name, Some(id)).await?;
        update.name = Some(name);
    }
    if let Some(description) = form.description {
        validate_description(&description)?;
        update.description = Some(description);
    }
    update.brand = form.brand;
    update.price = form.price.as_deref().map(parse_price).transpose()?;
    update.count_in_stock = form
        .count_in_stock
        .as_deref()
        .map(|raw| parse_count(raw, "countInStock"))
        .transpose()?;
    update.rating = form.rating.as_deref().map(parse_rating).transpose()?;
    update.num_reviews = form
        .num_reviews
        .as_deref()
        .map(|raw| parse_count(raw, "numReviews"))
        .transpose()?;
    if let Some(raw) = form.category {
        update.category_id = Some(resolve_category(&state, &raw).await?);
    }

    let new_image = match form.image {
        Some(image) => Some(state.images.store(&image.file_name, image.data).await?),
        None => None,
    };
    update.image = new_image.clone();

    let product = match state.db.update_product(id, update).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            if let Some(path) = &new_image {
                remove_image(&state, path).await;
            }
            return Err(ApiError::NotFound(format!("No product found with id {}", id)));
        }
        Err(e) => {
            if let Some(path) = &new_image {
                remove_image(&state, path).await;
            }
            return Err(e.into());
        }
    };

    if new_image.is_some() {
        remove_image(&state, &existing.image).await;
    }

    info!("Updated product {}", id);

    Ok(ApiResponse::ok(
        "Product is updated",
        ProductData {
            product: product.into(),
        },
    ))
}

/// GET /api/products/getallproducts
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PaginationQuery>,
) -> Result<ApiResponse<ProductsData>, ApiError> {
    let page = Page::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PRODUCTS_PER_PAGE),
    );
    let products = state.db.list_products(page).await?;

    Ok(ApiResponse::ok(
        "All products returned!",
        ProductsData {
            products: products.into_iter().map(ProductResponse::from).collect(),
        },
    ))
}

/// GET /api/products/search
async fn search_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<ApiResponse<ProductsData>, ApiError> {
    let page = Page::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PRODUCTS_PER_PAGE),
    );
    let term = query.search_value.unwrap_or_default();
    let products = state.db.search_products(&term, page).await?;

    Ok(ApiResponse::ok(
        "Searched products returned successfully!",
        ProductsData {
            products: products.into_iter().map(ProductResponse::from).collect(),
        },
    ))
}

/// GET /api/products/getsingleproduct/{id}
async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<ProductData>, ApiError> {
    let product = state
        .db
        .get_product_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product is not found.".to_string()))?;

    Ok(ApiResponse::ok(
        "Product was returned successfully!",
        ProductData {
            product: product.into(),
        },
    ))
}

/// DELETE /api/products/deleteproduct/{id} (Admin only)
async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, ApiError> {
    let product = state
        .db
        .delete_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product is not found.".to_string()))?;

    remove_image(&state, &product.image).await;
    info!("Deleted product {} ({})", product.id, product.name);

    Ok(ApiResponse::message("Product is deleted successfully."))
}

/// POST /api/products/filteredproducts
async fn filter_products(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilterRequest>,
) -> Result<ApiResponse<ProductsData>, ApiError> {
    let price_range = match request.checked_price.as_deref() {
        Some([low, high]) => Some((*low, *high)),
        _ => None,
    };
    let filter = ProductFilter {
        price_range,
        category_ids: request.checked_category.unwrap_or_default(),
    };
    let products = state.db.filter_products(&filter).await?;

    Ok(ApiResponse::ok(
        "Products filtered successfully!",
        ProductsData {
            products: products.into_iter().map(ProductResponse::from).collect(),
        },
    ))
}

/// Create product routes, mounted under `/api/products`
pub fn routes(state: &AppState) -> Router<AppState> {
    let body_limit = state.settings.max_image_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", admin_only(post(create_product), state))
        .route("/updateproduct/{id}", admin_only(put(update_product), state))
        .route("/deleteproduct/{id}", admin_only(delete(delete_product), state))
        .route("/getallproducts", get(list_products))
        .route("/search", get(search_products))
        .route("/getsingleproduct/{id}", get(get_product))
        .route("/filteredproducts", post(filter_products))
        .layer(DefaultBodyLimit::max(body_limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(validate_name("ab").is_err());
        assert!(validate_name("abc").is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(parse_price("19.99").unwrap(), 19.99);
        assert!(parse_price("0").is_err());
        assert!(parse_price("-3").is_err());
        assert!(parse_price("NaN").is_err());
        assert!(parse_price("cheap").is_err());

        assert_eq!(parse_count("4", "countInStock").unwrap(), 4);
        assert!(parse_count("-1", "countInStock").is_err());

        assert!(parse_rating("4.5").is_ok());
        assert!(parse_rating("7").is_err());
    }
}
