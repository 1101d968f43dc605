use crate::keys::{generate_asset_key, validate_key};
use crate::traits::{AssetStore, DeleteOutcome, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use folio_core::models::{Asset, AssetKey};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult, WriteMultipart};

/// Parts kept in flight while a multipart upload is being written.
const MULTIPART_MAX_CONCURRENCY: usize = 4;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the environment; bucket and region are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage { store, bucket })
    }

    async fn put_multipart_parts(
        &self,
        location: &Path,
        asset: &Asset,
        chunk_size: usize,
    ) -> ObjectResult<usize> {
        let upload = self.store.put_multipart(location).await?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, chunk_size);

        let mut parts = 0usize;
        for chunk in asset.data.chunks(chunk_size.max(1)) {
            if let Err(e) = writer.wait_for_capacity(MULTIPART_MAX_CONCURRENCY).await {
                let _ = writer.abort().await;
                return Err(e);
            }
            writer.write(chunk);
            parts += 1;
        }

        writer.finish().await?;
        Ok(parts)
    }
}

#[async_trait]
impl AssetStore for S3Storage {
    async fn put(&self, folder: &str, asset: &Asset) -> StorageResult<AssetKey> {
        let key = generate_asset_key(folder, asset);
        let size = asset.size_bytes();
        let location = Path::from(key.as_str());

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put(&location, PutPayload::from(asset.data.clone()))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(key)
    }

    async fn put_chunked(
        &self,
        folder: &str,
        asset: &Asset,
        chunk_size: usize,
    ) -> StorageResult<AssetKey> {
        let key = generate_asset_key(folder, asset);
        let size = asset.size_bytes();
        let location = Path::from(key.as_str());

        let start = std::time::Instant::now();

        let parts = self
            .put_multipart_parts(&location, asset, chunk_size)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    chunk_size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 multipart upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            parts,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload successful"
        );

        Ok(key)
    }

    async fn delete(&self, key: &AssetKey) -> StorageResult<DeleteOutcome> {
        validate_key(key.as_str())?;
        let start = std::time::Instant::now();
        let location = Path::from(key.as_str());

        // S3 deletes are idempotent, so existence is checked first.
        match self.store.head(&location).await {
            Ok(_) => {}
            Err(ObjectStoreError::NotFound { .. }) => return Ok(DeleteOutcome::NotFound),
            Err(e) => return Err(StorageError::DeleteFailed(e.to_string())),
        }

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) => {}
            Err(ObjectStoreError::NotFound { .. }) => return Ok(DeleteOutcome::NotFound),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(DeleteOutcome::Deleted)
    }

    async fn exists(&self, key: &AssetKey) -> StorageResult<bool> {
        let location = Path::from(key.as_str());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
