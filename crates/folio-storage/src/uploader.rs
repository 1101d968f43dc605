//! Size-aware upload front for an [`AssetStore`].

use std::sync::Arc;

use folio_core::models::{Asset, AssetKey};
use folio_core::Config;

use crate::keys::folder_path;
use crate::traits::{AssetStore, DeleteOutcome, StorageError, StorageResult};

/// Where assets go and when the chunked path is used.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub base_folder: String,
    /// Assets strictly larger than this go through `put_chunked`.
    pub large_threshold_bytes: usize,
    pub chunk_size_bytes: usize,
}

impl UploadPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_folder: config.storage().base_folder.clone(),
            large_threshold_bytes: config.uploads().large_threshold_bytes,
            chunk_size_bytes: config.uploads().chunk_size_bytes,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            base_folder: "uploads".to_string(),
            large_threshold_bytes: 8_000_000,
            chunk_size_bytes: 6_000_000,
        }
    }
}

#[derive(Clone)]
pub struct AssetUploader {
    store: Arc<dyn AssetStore>,
    policy: UploadPolicy,
}

impl AssetUploader {
    pub fn new(store: Arc<dyn AssetStore>, policy: UploadPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Folder for one creation: `{base_folder}/{sub_folder}`.
    pub fn folder_for(&self, sub_folder: &str) -> String {
        folder_path(&self.policy.base_folder, sub_folder)
    }

    /// Upload one asset into `folder`, picking the single or chunked path by size.
    pub async fn upload(&self, folder: &str, asset: &Asset) -> StorageResult<AssetKey> {
        if asset.is_empty() {
            return Err(StorageError::EmptyAsset(asset.filename.clone()));
        }

        if asset.size_bytes() > self.policy.large_threshold_bytes {
            tracing::debug!(
                filename = %asset.filename,
                size_bytes = asset.size_bytes(),
                chunk_size = self.policy.chunk_size_bytes,
                "Using chunked upload"
            );
            self.store
                .put_chunked(folder, asset, self.policy.chunk_size_bytes)
                .await
        } else {
            self.store.put(folder, asset).await
        }
    }

    /// Delete by key. A blank key is reported as not found without reaching the store.
    pub async fn delete_by_key(&self, key: &AssetKey) -> StorageResult<DeleteOutcome> {
        if key.is_blank() {
            return Ok(DeleteOutcome::NotFound);
        }
        self.store.delete(key).await
    }
}
