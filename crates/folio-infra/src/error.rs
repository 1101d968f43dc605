//! Error reports
//!
//! `ErrorResponse` is the machine-readable shape of a failure handed back to a caller.
//! Sensitive errors only expose their client message.

use folio_core::{ErrorMetadata, LogLevel};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn from_error<E>(err: &E) -> Self
    where
        E: ErrorMetadata + std::fmt::Display,
    {
        let details = if err.is_sensitive() {
            None
        } else {
            Some(err.to_string())
        };
        Self {
            error: err.client_message(),
            error_code: err.error_code(),
            details,
            suggested_action: err.suggested_action(),
            recoverable: err.is_recoverable(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Emit the error at the level it declares.
pub fn log_error<E>(err: &E)
where
    E: ErrorMetadata + std::fmt::Display,
{
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Error => tracing::error!(error_code = code, error = %err, "Operation failed"),
        LogLevel::Warn => tracing::warn!(error_code = code, error = %err, "Operation failed"),
        LogLevel::Debug => tracing::debug!(error_code = code, error = %err, "Operation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::AppError;

    #[test]
    fn sensitive_errors_hide_details() {
        let response = ErrorResponse::from_error(&AppError::Database("password=hunter2".into()));
        assert_eq!(response.error_code, "DATABASE_ERROR");
        assert!(response.details.is_none());
        assert!(!response.error.contains("hunter2"));
    }

    #[test]
    fn not_found_keeps_details() {
        let response = ErrorResponse::from_error(&AppError::NotFound("Project x".into()))
            .with_extra(serde_json::json!({ "id": "x" }));
        assert!(response.details.unwrap().contains("Project x"));
        assert_eq!(response.extra.unwrap()["id"], "x");
    }
}
