//! Asset store abstraction trait
//!
//! This module defines the AssetStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use folio_core::models::{Asset, AssetKey};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Asset is empty: {0}")]
    EmptyAsset(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a delete call. Both variants count as a successful cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Asset store abstraction trait
///
/// The store owns key generation: `put` returns a key unique within the store.
/// Calls are independent; there is no transaction spanning several of them, and a call
/// may fail or never complete.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store the asset under `folder` and return its key.
    async fn put(&self, folder: &str, asset: &Asset) -> StorageResult<AssetKey>;

    /// Store the asset in parts of `chunk_size` bytes.
    ///
    /// Backends without a multipart path fall back to a single put.
    async fn put_chunked(
        &self,
        folder: &str,
        asset: &Asset,
        _chunk_size: usize,
    ) -> StorageResult<AssetKey> {
        self.put(folder, asset).await
    }

    /// Delete an object by key
    async fn delete(&self, key: &AssetKey) -> StorageResult<DeleteOutcome>;

    /// Check if an object exists
    async fn exists(&self, key: &AssetKey) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
