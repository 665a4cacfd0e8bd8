//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DbError {
    /// Classify a write error, turning constraint failures into typed variants
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return DbError::Duplicate(what.to_string());
            }
            if db_err.is_foreign_key_violation() {
                return DbError::Constraint(what.to_string());
            }
        }
        DbError::Connection(err)
    }
}
