use crate::keys::{generate_asset_key, validate_key};
use crate::traits::{AssetStore, DeleteOutcome, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use folio_core::models::{Asset, AssetKey};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored assets (e.g., "/var/lib/folio/assets")
    /// * `base_url` - Optional base URL the directory is served from, used in log output
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: Option<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn public_url(&self, key: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_parts(&self, folder: &str, asset: &Asset, chunk_size: usize) -> StorageResult<AssetKey> {
        let key = generate_asset_key(folder, asset);
        let path = self.key_to_path(key.as_str())?;
        let size = asset.size_bytes();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut parts = 0usize;
        for chunk in asset.data.chunks(chunk_size.max(1)) {
            file.write_all(chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
            })?;
            parts += 1;
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            url = ?self.public_url(key.as_str()),
            size_bytes = size,
            parts,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(key)
    }
}

#[async_trait]
impl AssetStore for LocalStorage {
    async fn put(&self, folder: &str, asset: &Asset) -> StorageResult<AssetKey> {
        let whole = asset.size_bytes();
        self.write_parts(folder, asset, whole).await
    }

    async fn put_chunked(
        &self,
        folder: &str,
        asset: &Asset,
        chunk_size: usize,
    ) -> StorageResult<AssetKey> {
        self.write_parts(folder, asset, chunk_size).await
    }

    async fn delete(&self, key: &AssetKey) -> StorageResult<DeleteOutcome> {
        let path = self.key_to_path(key.as_str())?;
        let start = std::time::Instant::now();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(DeleteOutcome::NotFound);
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(DeleteOutcome::Deleted)
    }

    async fn exists(&self, key: &AssetKey) -> StorageResult<bool> {
        let path = self.key_to_path(key.as_str())?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, Some("http://localhost:3000/assets".to_string()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_put_and_delete() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let asset = Asset::new("test.txt", b"test data".to_vec());
        let key = storage.put("uploads/abc", &asset).await.unwrap();

        assert!(key.as_str().starts_with("uploads/abc/"));
        assert!(key.as_str().ends_with(".txt"));
        assert!(storage.exists(&key).await.unwrap());

        let on_disk = std::fs::read(dir.path().join(key.as_str())).unwrap();
        assert_eq!(on_disk, b"test data");

        assert_eq!(storage.delete(&key).await.unwrap(), DeleteOutcome::Deleted);
        assert!(!storage.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_chunked_put_writes_whole_payload() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let asset = Asset::new("big.jpg", data.clone());
        let key = storage.put_chunked("uploads/big", &asset, 3_000).await.unwrap();

        let on_disk = std::fs::read(dir.path().join(key.as_str())).unwrap();
        assert_eq!(on_disk, data);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete(&AssetKey::new("../etc/passwd")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists(&AssetKey::new("/etc/passwd")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete(&AssetKey::new("nonexistent/file.txt")).await;
        assert_eq!(result.unwrap(), DeleteOutcome::NotFound);
    }
}
