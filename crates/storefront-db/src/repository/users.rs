//! User operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewUser, User};
use crate::repository::{Database, Page};
use crate::utils::normalize_email;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, is_admin, is_banned, created_at, updated_at";

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();
        let email = normalize_email(&user.email);

        // Check if user already exists
        if self.get_user_by_email(&email).await?.is_some() {
            return Err(DbError::Duplicate(format!("User '{}' already exists", email)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, is_admin, is_banned, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_write(e, &format!("User '{}' already exists", email)))?;

        let id: i64 = result.get("id");

        Ok(User {
            id,
            name: user.name,
            email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            is_banned: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user by email (normalized before lookup)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List non-admin users, oldest first
    pub async fn list_customers(&self, page: Page) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_admin = 0 ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| User::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Update the display name
    pub async fn update_user_name(&self, id: i64, name: &str) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash of the user with this email
    pub async fn update_user_password(&self, email: &str, password_hash: &str) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, updated_at = ?
            WHERE email = ?
            "#,
        )
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(normalize_email(email))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the banned flag
    pub async fn set_user_banned(&self, id: i64, banned: bool) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(banned)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any admin exists
    pub async fn has_admin(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users WHERE is_admin = 1")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, is_admin: bool) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn test_insert_normalizes_and_rejects_duplicates() {
        let db = Database::in_memory().await.unwrap();

        let user = db.insert_user(new_user(" A@X.com ", false)).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_banned);

        let found = db.get_user_by_email("a@X.COM").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        let err = db.insert_user(new_user("a@x.com", false)).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_list_customers_skips_admins() {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(new_user("admin@x.com", true)).await.unwrap();
        for i in 0..7 {
            db.insert_user(new_user(&format!("u{i}@x.com"), false)).await.unwrap();
        }

        let first = db.list_customers(Page::new(1, 5)).await.unwrap();
        assert_eq!(first.len(), 5);
        assert!(first.iter().all(|u| !u.is_admin));
        assert_eq!(first[0].email, "u0@x.com");

        let second = db.list_customers(Page::new(2, 5)).await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(db.has_admin().await.unwrap());
    }

    #[tokio::test]
    async fn test_ban_rename_and_delete() {
        let db = Database::in_memory().await.unwrap();
        let user = db.insert_user(new_user("b@x.com", false)).await.unwrap();

        assert!(db.set_user_banned(user.id, true).await.unwrap());
        assert!(db.update_user_name(user.id, "Bee").await.unwrap());
        assert!(db.update_user_password("B@x.com", "new-hash").await.unwrap());

        let user = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(user.is_banned);
        assert_eq!(user.name, "Bee");
        assert_eq!(user.password_hash, "new-hash");

        assert!(db.delete_user(user.id).await.unwrap());
        assert!(!db.delete_user(user.id).await.unwrap());
        assert!(db.get_user_by_id(user.id).await.unwrap().is_none());
    }
}
