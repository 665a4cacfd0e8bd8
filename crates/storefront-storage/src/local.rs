//! Local disk image store

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{IMAGE_URL_PREFIX, ImageStore, file_name_from_path, sanitize_file_name};
use crate::error::StorageError;

/// Local disk image store
///
/// Files live flat in `<base_path>/<millis>-<short id>-<sanitized name>`;
/// the directory is what the HTTP layer serves under `/images/products`.
pub struct LocalImageStore {
    base_path: PathBuf,
}

impl LocalImageStore {
    /// Create a new local image store, creating the directory if needed
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;

        info!("Initialized local image storage at {:?}", base_path);

        Ok(Self { base_path })
    }

    fn file_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(file_name_from_path(path)?))
    }

    fn unique_file_name(original_name: &str) -> String {
        let short_id = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &short_id[..8],
            sanitize_file_name(original_name)
        )
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, original_name: &str, data: Bytes) -> Result<String, StorageError> {
        let file_name = Self::unique_file_name(original_name);
        let path = self.base_path.join(&file_name);
        debug!("Writing {} byte image to {:?}", data.len(), path);

        // Write atomically using a temp file
        let temp_path = self.base_path.join(format!(".{}.tmp", file_name));
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &path).await?;

        Ok(format!("{}/{}", IMAGE_URL_PREFIX, file_name))
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(path)?;
        debug!("Deleting image at {:?}", file_path);

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("products");
        let store = LocalImageStore::new(&base).await.unwrap();

        let data = Bytes::from_static(b"\x89PNG fake image");
        let path = store.store("my photo.png", data.clone()).await.unwrap();

        assert!(path.starts_with("images/products/"));
        assert!(path.ends_with("-my_photo.png"));
        let on_disk = base.join(file_name_from_path(&path).unwrap());
        assert_eq!(std::fs::read(&on_disk).unwrap(), data.as_ref());

        assert!(store.delete(&path).await.unwrap());
        assert!(!on_disk.exists());
        assert!(!store.delete(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalImageStore::new(temp_dir.path()).await.unwrap();

        let a = store.store("a.png", Bytes::from_static(b"a")).await.unwrap();
        let b = store.store("a.png", Bytes::from_static(b"b")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_missing_and_foreign_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalImageStore::new(temp_dir.path()).await.unwrap();

        assert!(!store.delete("images/products/nope.png").await.unwrap());

        let result = store.delete("images/products/../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }
}
