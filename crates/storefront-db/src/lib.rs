//! Storefront Database Layer
//!
//! This crate provides the persistence layer for Storefront: identities,
//! categories and products, stored in SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{Database, Page};
