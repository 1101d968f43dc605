//! In-process asset store, used when no remote backend is configured and by tests.

use crate::keys::generate_asset_key;
use crate::traits::{AssetStore, DeleteOutcome, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use folio_core::models::{Asset, AssetKey};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn get(&self, key: &AssetKey) -> Option<Bytes> {
        self.objects.read().await.get(key.as_str()).cloned()
    }

    pub async fn keys(&self) -> Vec<AssetKey> {
        let mut keys: Vec<AssetKey> = self
            .objects
            .read()
            .await
            .keys()
            .map(|k| AssetKey::new(k.clone()))
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl AssetStore for MemoryStorage {
    async fn put(&self, folder: &str, asset: &Asset) -> StorageResult<AssetKey> {
        let key = generate_asset_key(folder, asset);
        self.objects
            .write()
            .await
            .insert(key.as_str().to_string(), asset.data.clone());

        tracing::debug!(key = %key, size_bytes = asset.size_bytes(), "Memory storage put");
        Ok(key)
    }

    async fn delete(&self, key: &AssetKey) -> StorageResult<DeleteOutcome> {
        match self.objects.write().await.remove(key.as_str()) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn exists(&self, key: &AssetKey) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key.as_str()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
