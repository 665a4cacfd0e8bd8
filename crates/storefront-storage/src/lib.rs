//! Storefront Storage Layer
//!
//! This crate stores uploaded product images and hands back the public
//! path recorded on the product.

pub mod backend;
pub mod error;
pub mod local;

pub use backend::{IMAGE_URL_PREFIX, ImageStore};
pub use error::StorageError;
pub use local::LocalImageStore;
