//! Folio Storage Library
//!
//! This crate provides the asset store abstraction and its implementations.
//! It includes the `AssetStore` trait, the size-aware `AssetUploader`, and backends
//! for S3 (via `object_store`), the local filesystem, and memory.
//!
//! # Key format
//!
//! Every creation uploads into its own folder, `{base_folder}/{correlation_id}`, and each
//! stored object gets a fresh key `{folder}/{uuid}.{ext}`. Keys must not contain `..` or a
//! leading `/`. Key generation is centralized in the `keys` module so all backends stay
//! consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
pub mod uploader;

// Re-export commonly used types
pub use factory::create_storage;
pub use folio_core::models::{Asset, AssetKey};
pub use folio_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{AssetStore, DeleteOutcome, StorageError, StorageResult};
pub use uploader::{AssetUploader, UploadPolicy};
