//! Product operations

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::error::DbError;
use crate::models::{NewProduct, Product, ProductFilter, UpdateProduct};
use crate::repository::{Database, Page};

const PRODUCT_COLUMNS: &str = "id, name, image, brand, description, rating, num_reviews, price, \
     count_in_stock, sold, category_id, created_at, updated_at";

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    // ==================== Product Operations ====================

    /// Insert a new product
    pub async fn insert_product(&self, product: NewProduct) -> Result<Product, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (name, image, brand, description, rating, num_reviews, price, count_in_stock, sold, category_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(&product.image)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.rating)
        .bind(product.num_reviews)
        .bind(product.price)
        .bind(product.count_in_stock)
        .bind(product.category_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_write(e, &format!("Product '{}'", product.name)))?;

        Ok(Product {
            id: result.get("id"),
            name: product.name,
            image: product.image,
            brand: product.brand,
            description: product.description,
            rating: product.rating,
            num_reviews: product.num_reviews,
            price: product.price,
            count_in_stock: product.count_in_stock,
            sold: 0,
            category_id: product.category_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a product by ID
    pub async fn get_product_by_id(&self, id: i64) -> Result<Option<Product>, DbError> {
        let result = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Product::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a product by its exact name
    pub async fn get_product_by_name(&self, name: &str) -> Result<Option<Product>, DbError> {
        let result = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Product::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List products, newest first
    pub async fn list_products(&self, page: Page) -> Result<Vec<Product>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Product::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Case-insensitive substring search over name and description
    ///
    /// An empty term matches every product.
    pub async fn search_products(&self, term: &str, page: Page) -> Result<Vec<Product>, DbError> {
        let pattern = format!("%{}%", escape_like(term.trim()));
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE name LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\'
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Product::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Products matching a price range and/or a set of categories
    pub async fn filter_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DbError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));

        if let Some((low, high)) = filter.price_range {
            builder
                .push(" AND price >= ")
                .push_bind(low)
                .push(" AND price <= ")
                .push_bind(high);
        }

        if !filter.category_ids.is_empty() {
            builder.push(" AND category_id IN (");
            let mut separated = builder.separated(", ");
            for id in &filter.category_ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
        }

        builder.push(" ORDER BY id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Product::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Apply a partial update, returning the updated row
    pub async fn update_product(
        &self,
        id: i64,
        update: UpdateProduct,
    ) -> Result<Option<Product>, DbError> {
        if update.is_empty() {
            return self.get_product_by_id(id).await;
        }

        let now = Utc::now();
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE products SET updated_at = ");
        builder.push_bind(now.to_rfc3339());

        if let Some(name) = &update.name {
            builder.push(", name = ").push_bind(name.clone());
        }
        if let Some(image) = &update.image {
            builder.push(", image = ").push_bind(image.clone());
        }
        if let Some(brand) = &update.brand {
            builder.push(", brand = ").push_bind(brand.clone());
        }
        if let Some(description) = &update.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(rating) = update.rating {
            builder.push(", rating = ").push_bind(rating);
        }
        if let Some(num_reviews) = update.num_reviews {
            builder.push(", num_reviews = ").push_bind(num_reviews);
        }
        if let Some(price) = update.price {
            builder.push(", price = ").push_bind(price);
        }
        if let Some(count_in_stock) = update.count_in_stock {
            builder.push(", count_in_stock = ").push_bind(count_in_stock);
        }
        if let Some(category_id) = update.category_id {
            builder.push(", category_id = ").push_bind(category_id);
        }

        builder.push(" WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, &format!("Product {}", id)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_product_by_id(id).await
    }

    /// Delete a product, returning the removed row
    pub async fn delete_product(&self, id: i64) -> Result<Option<Product>, DbError> {
        let Some(product) = self.get_product_by_id(id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCategory;

    async fn seed() -> (Database, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        let phones = db
            .insert_category(NewCategory { name: "Phones".into(), slug: "phones".into() })
            .await
            .unwrap();
        let books = db
            .insert_category(NewCategory { name: "Books".into(), slug: "books".into() })
            .await
            .unwrap();

        for (name, price, category) in [
            ("Pixel", 499.0, phones.id),
            ("Galaxy", 899.0, phones.id),
            ("Rust in Action", 39.5, books.id),
            ("100% Cotton Tote", 12.0, books.id),
        ] {
            db.insert_product(NewProduct {
                name: name.to_string(),
                image: format!("images/products/{name}.png"),
                brand: "Acme".to_string(),
                description: format!("The {name} description"),
                rating: 0.0,
                num_reviews: 0,
                price,
                count_in_stock: 3,
                category_id: category,
            })
            .await
            .unwrap();
        }
        (db, phones.id, books.id)
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (db, _, _) = seed().await;
        let page = db.list_products(Page::new(1, 3)).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].name, "100% Cotton Tote");

        let rest = db.list_products(Page::new(2, 3)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "Pixel");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_literal() {
        let (db, _, _) = seed().await;

        let hits = db.search_products("PIXEL", Page::new(1, 10)).await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = db.search_products("description", Page::new(1, 10)).await.unwrap();
        assert_eq!(hits.len(), 4);

        // '%' must not act as a wildcard
        let hits = db.search_products("100%", Page::new(1, 10)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "100% Cotton Tote");
    }

    #[tokio::test]
    async fn test_filter_by_price_and_category() {
        let (db, phones, books) = seed().await;

        let cheap = db
            .filter_products(&ProductFilter { price_range: Some((0.0, 50.0)), category_ids: vec![] })
            .await
            .unwrap();
        assert_eq!(cheap.len(), 2);

        let cheap_phones = db
            .filter_products(&ProductFilter {
                price_range: Some((0.0, 500.0)),
                category_ids: vec![phones],
            })
            .await
            .unwrap();
        assert_eq!(cheap_phones.len(), 1);
        assert_eq!(cheap_phones[0].name, "Pixel");

        let all = db
            .filter_products(&ProductFilter { price_range: None, category_ids: vec![phones, books] })
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, _, books) = seed().await;
        let pixel = db.get_product_by_name("Pixel").await.unwrap().unwrap();

        let updated = db
            .update_product(
                pixel.id,
                UpdateProduct {
                    price: Some(450.0),
                    category_id: Some(books),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price, 450.0);
        assert_eq!(updated.category_id, books);
        assert_eq!(updated.name, "Pixel");

        let err = db
            .update_product(pixel.id, UpdateProduct { category_id: Some(9999), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));

        let removed = db.delete_product(pixel.id).await.unwrap().unwrap();
        assert_eq!(removed.image, "images/products/Pixel.png");
        assert!(db.delete_product(pixel.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_category_with_products_cannot_be_deleted() {
        let (db, _, _) = seed().await;
        let err = db.delete_category("phones").await.unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }
}
