//! Errors of a project creation.

use std::fmt;
use std::time::Duration;

use folio_core::{AppError, ErrorMetadata, FieldErrors, LogLevel};
use folio_storage::StorageError;

use crate::cleanup::CleanupReport;
use crate::pool::PoolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Thumbnail,
    Gallery,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStage::Thumbnail => write!(f, "thumbnail"),
            UploadStage::Gallery => write!(f, "gallery"),
        }
    }
}

/// A creation either fully succeeds or fails with one of these.
///
/// Every variant raised after uploads began carries the cleanup report; delete failures
/// during cleanup are counted there and never become an error of their own.
#[derive(Debug, thiserror::Error)]
pub enum CreateProjectError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{stage} upload failed ({cleanup}): {source}")]
    Upload {
        stage: UploadStage,
        #[source]
        source: StorageError,
        cleanup: CleanupReport,
    },

    #[error("Uploads did not complete within {}s ({cleanup})", .after.as_secs_f64())]
    Timeout {
        after: Duration,
        cleanup: CleanupReport,
    },

    #[error("Upload scheduling failed ({cleanup}): {source}")]
    Scheduling {
        #[source]
        source: PoolError,
        cleanup: CleanupReport,
    },

    #[error("Saving project failed ({cleanup}): {source}")]
    Persistence {
        #[source]
        source: AppError,
        cleanup: CleanupReport,
    },
}

impl CreateProjectError {
    pub fn cleanup(&self) -> Option<&CleanupReport> {
        match self {
            CreateProjectError::Validation(_) => None,
            CreateProjectError::Upload { cleanup, .. }
            | CreateProjectError::Timeout { cleanup, .. }
            | CreateProjectError::Scheduling { cleanup, .. }
            | CreateProjectError::Persistence { cleanup, .. } => Some(cleanup),
        }
    }
}

impl ErrorMetadata for CreateProjectError {
    fn error_code(&self) -> &'static str {
        match self {
            CreateProjectError::Validation(_) => "VALIDATION_ERROR",
            CreateProjectError::Upload { .. } => "UPLOAD_FAILED",
            CreateProjectError::Timeout { .. } => "UPLOAD_TIMEOUT",
            CreateProjectError::Scheduling { .. } => "UPLOAD_UNAVAILABLE",
            CreateProjectError::Persistence { .. } => "PERSISTENCE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, CreateProjectError::Validation(_))
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            CreateProjectError::Validation(_) => Some("Check request parameters and try again"),
            CreateProjectError::Upload { .. } | CreateProjectError::Timeout { .. } => {
                Some("Retry the creation; no partial project was saved")
            }
            CreateProjectError::Scheduling { .. } => Some("Retry after a short delay"),
            CreateProjectError::Persistence { .. } => Some("Retry after a short delay"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            CreateProjectError::Validation(fields) => fields.to_string(),
            CreateProjectError::Upload { stage, .. } => format!("Failed to upload {} image", stage),
            CreateProjectError::Timeout { after, .. } => {
                format!("Uploads did not complete within {}s", after.as_secs())
            }
            CreateProjectError::Scheduling { .. } => "Upload service unavailable".to_string(),
            CreateProjectError::Persistence { .. } => "Failed to save project".to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        matches!(self, CreateProjectError::Persistence { .. })
    }

    fn log_level(&self) -> LogLevel {
        match self {
            CreateProjectError::Validation(_) => LogLevel::Debug,
            CreateProjectError::Upload { .. } | CreateProjectError::Timeout { .. } => LogLevel::Warn,
            CreateProjectError::Scheduling { .. } | CreateProjectError::Persistence { .. } => {
                LogLevel::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_mentions_stage_and_cleanup() {
        let err = CreateProjectError::Upload {
            stage: UploadStage::Gallery,
            source: StorageError::UploadFailed("503".to_string()),
            cleanup: CleanupReport {
                attempted: 2,
                deleted: 2,
                ..CleanupReport::default()
            },
        };
        let message = err.to_string();
        assert!(message.starts_with("gallery upload failed"));
        assert!(message.contains("cleaned 2 of 2"));
        assert_eq!(err.cleanup().map(|c| c.deleted), Some(2));
        assert_eq!(err.error_code(), "UPLOAD_FAILED");
    }

    #[test]
    fn validation_has_no_cleanup() {
        let mut fields = FieldErrors::default();
        fields.insert("title", "title is required");
        let err = CreateProjectError::Validation(fields);
        assert!(err.cleanup().is_none());
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "title: title is required");
    }
}
