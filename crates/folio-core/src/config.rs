//! Configuration module
//!
//! This module provides configuration structures for the database, the asset store,
//! and the upload pool / orchestration settings.

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const BASE_FOLDER: &str = "uploads";
const LARGE_THRESHOLD_BYTES: usize = 8_000_000;
const CHUNK_SIZE_BYTES: usize = 6_000_000;
const POOL_MAX_WORKERS: usize = 4;
const POOL_QUEUE_CAPACITY: usize = 100;
const PARALLEL_TIMEOUT_SECS: u64 = 120;
const SETTLE_GRACE_MS: u64 = 2_000;
const CLEANUP_TIMEOUT_SECS: u64 = 30;

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub environment: String,
    /// Absent means the in-memory repository is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

/// Asset store configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub base_folder: String,
}

/// Upload pool and orchestration configuration
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub large_threshold_bytes: usize,
    pub chunk_size_bytes: usize,
    pub pool_max_workers: usize,
    pub pool_queue_capacity: usize,
    pub parallel_timeout_seconds: u64,
    /// Grace given to in-flight uploads after a batch failure before they are aborted.
    pub settle_grace_ms: u64,
    pub cleanup_timeout_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct FolioConfig {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<FolioConfig>);

impl Config {
    fn inner(&self) -> &FolioConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.inner().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = FolioConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn base(&self) -> &BaseConfig {
        &self.inner().base
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.inner().storage
    }

    pub fn uploads(&self) -> &UploadConfig {
        &self.inner().uploads
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().base.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn parallel_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().uploads.parallel_timeout_seconds)
    }

    pub fn settle_grace(&self) -> Duration {
        Duration::from_millis(self.inner().uploads.settle_grace_ms)
    }

    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().uploads.cleanup_timeout_seconds)
    }
}

impl FolioConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let base = BaseConfig {
            environment,
            database_url: var("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
        };

        let backend = match var("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::Memory,
        };

        let storage = StorageConfig {
            backend,
            s3_bucket: var("S3_BUCKET").filter(|s| !s.is_empty()),
            s3_region: var("S3_REGION")
                .or_else(|| var("AWS_REGION"))
                .filter(|s| !s.is_empty()),
            s3_endpoint: var("S3_ENDPOINT").filter(|s| !s.is_empty()),
            local_storage_path: var("LOCAL_STORAGE_PATH").filter(|s| !s.is_empty()),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL").filter(|s| !s.is_empty()),
            base_folder: var("STORAGE_BASE_FOLDER")
                .map(|s| s.trim().trim_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| BASE_FOLDER.to_string()),
        };

        let uploads = UploadConfig {
            large_threshold_bytes: var("UPLOADS_LARGE_THRESHOLD_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(LARGE_THRESHOLD_BYTES),
            chunk_size_bytes: var("UPLOADS_CHUNK_SIZE_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CHUNK_SIZE_BYTES),
            pool_max_workers: var("UPLOAD_POOL_MAX_WORKERS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(POOL_MAX_WORKERS),
            pool_queue_capacity: var("UPLOAD_POOL_QUEUE_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(POOL_QUEUE_CAPACITY),
            parallel_timeout_seconds: var("UPLOADS_PARALLEL_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PARALLEL_TIMEOUT_SECS),
            settle_grace_ms: var("UPLOADS_SETTLE_GRACE_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(SETTLE_GRACE_MS),
            cleanup_timeout_seconds: var("UPLOADS_CLEANUP_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CLEANUP_TIMEOUT_SECS),
        };

        let config = FolioConfig {
            base,
            storage,
            uploads,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.base.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.uploads.pool_max_workers == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_POOL_MAX_WORKERS must be greater than zero"
            ));
        }
        if self.uploads.pool_queue_capacity == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_POOL_QUEUE_CAPACITY must be greater than zero"
            ));
        }
        if self.uploads.parallel_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "UPLOADS_PARALLEL_TIMEOUT_SECONDS must be greater than zero"
            ));
        }
        if self.uploads.chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "UPLOADS_CHUNK_SIZE_BYTES must be greater than zero"
            ));
        }
        if self.uploads.chunk_size_bytes > self.uploads.large_threshold_bytes {
            return Err(anyhow::anyhow!(
                "UPLOADS_CHUNK_SIZE_BYTES ({}) cannot exceed UPLOADS_LARGE_THRESHOLD_BYTES ({})",
                self.uploads.chunk_size_bytes,
                self.uploads.large_threshold_bytes
            ));
        }

        // Validate storage backend configuration
        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}
