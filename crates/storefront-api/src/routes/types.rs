//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use storefront_db::{Category, Product, User};

// ==================== User Types ====================

/// Registration request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body carrying an emailed token (activation, password reset)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub token: Option<String>,
}

/// Login and forget-password request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Profile update request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
}

/// User response (without password)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub is_banned: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            is_banned: user.is_banned,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}

// ==================== Query Types ====================

/// `?page=&limit=` with route-specific defaults
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Product search query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub search_value: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ==================== Category Types ====================

/// Create/update category request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

/// Category response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            created_at: category.created_at.to_rfc3339(),
            updated_at: category.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryData {
    pub category: CategoryResponse,
}

// ==================== Product Types ====================

/// Filter request: `checkedPrice` is `[low, high]`, `checkedCategory` a list of ids
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRequest {
    pub checked_price: Option<Vec<f64>>,
    pub checked_category: Option<Vec<i64>>,
}

/// Product response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub brand: String,
    pub description: String,
    pub rating: f64,
    pub num_reviews: i64,
    pub price: f64,
    pub count_in_stock: i64,
    pub sold: i64,
    pub category: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            image: product.image,
            brand: product.brand,
            description: product.description,
            rating: product.rating,
            num_reviews: product.num_reviews,
            price: product.price,
            count_in_stock: product.count_in_stock,
            sold: product.sold,
            category: product.category_id,
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductData {
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
pub struct ProductsData {
    pub products: Vec<ProductResponse>,
}
