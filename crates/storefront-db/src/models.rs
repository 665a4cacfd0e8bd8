//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// Registered identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Always stored normalized (trimmed, lowercase)
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Product category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New category (for insertion)
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

/// Catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Storage path of the product image
    pub image: String,
    pub brand: String,
    pub description: String,
    pub rating: f64,
    pub num_reviews: i64,
    pub price: f64,
    pub count_in_stock: i64,
    pub sold: i64,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New product (for insertion)
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub image: String,
    pub brand: String,
    pub description: String,
    pub rating: f64,
    pub num_reviews: i64,
    pub price: f64,
    pub count_in_stock: i64,
    pub category_id: i64,
}

/// Update product (for partial updates)
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub num_reviews: Option<i64>,
    pub price: Option<f64>,
    pub count_in_stock: Option<i64>,
    pub category_id: Option<i64>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.brand.is_none()
            && self.description.is_none()
            && self.rating.is_none()
            && self.num_reviews.is_none()
            && self.price.is_none()
            && self.count_in_stock.is_none()
            && self.category_id.is_none()
    }
}

/// Product filter criteria
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Inclusive price bounds
    pub price_range: Option<(f64, f64)>,
    /// Match any of these categories; empty means no category constraint
    pub category_ids: Vec<i64>,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            is_admin: row.try_get("is_admin")?,
            is_banned: row.try_get("is_banned")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Category {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Product {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            brand: row.try_get("brand")?,
            description: row.try_get("description")?,
            rating: row.try_get("rating")?,
            num_reviews: row.try_get("num_reviews")?,
            price: row.try_get("price")?,
            count_in_stock: row.try_get("count_in_stock")?,
            sold: row.try_get("sold")?,
            category_id: row.try_get("category_id")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}
