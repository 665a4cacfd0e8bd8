//! Image store trait

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Public path prefix under which stored images are served
pub const IMAGE_URL_PREFIX: &str = "images/products";

/// Image store trait
///
/// Implementations persist an uploaded file and return the path recorded on
/// the product, always of the form `images/products/<file name>`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an upload, returning its public path
    async fn store(&self, original_name: &str, data: Bytes) -> Result<String, StorageError>;

    /// Delete a stored image; `false` when it was already gone
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`
///
/// Directory components are dropped and anything else becomes `_`. An empty
/// result falls back to `image`.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Extract the stored file name from a public image path
pub fn file_name_from_path(path: &str) -> Result<&str, StorageError> {
    let name = path
        .trim_start_matches('/')
        .strip_prefix(IMAGE_URL_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;

    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(name)
}
