//! Category operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Category, NewCategory};
use crate::repository::Database;

impl Database {
    // ==================== Category Operations ====================

    /// Insert a new category
    pub async fn insert_category(&self, category: NewCategory) -> Result<Category, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, slug, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_write(e, &format!("Category '{}' already exists", category.name))
        })?;

        Ok(Category {
            id: result.get("id"),
            name: category.name,
            slug: category.slug,
            created_at: now,
            updated_at: now,
        })
    }

    /// List all categories by name
    pub async fn list_categories(&self) -> Result<Vec<Category>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM categories
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Category::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Get a category by slug
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM categories
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Category::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a category by name
    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM categories
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Category::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Check whether a category ID exists
    pub async fn category_exists(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }

    /// Rename the category identified by `slug`, returning the updated row
    pub async fn update_category(
        &self,
        slug: &str,
        update: NewCategory,
    ) -> Result<Option<Category>, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, updated_at = ?
            WHERE slug = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.slug)
        .bind(now.to_rfc3339())
        .bind(slug)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_write(e, &format!("Category '{}' already exists", update.name)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_category_by_slug(&update.slug).await
    }

    /// Delete a category by slug
    ///
    /// Fails with [`DbError::Constraint`] while products still reference it.
    pub async fn delete_category(&self, slug: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DbError::from_write(e, &format!("Category '{}' still has products", slug))
            })?;
        Ok(result.rows_affected() > 0)
    }
}
