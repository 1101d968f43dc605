//! Folio Core Library
//!
//! This crate provides the domain models, error types, configuration, and validation
//! shared by the storage, persistence, and upload orchestration crates.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, FolioConfig, StorageConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use validation::{validate_create_project, FieldErrors};
