//! Folio Infrastructure Library
//!
//! Shared infrastructure for Folio binaries:
//! - Telemetry initialization
//! - Error reports for callers

pub mod error;
pub mod telemetry;

pub use error::{log_error, ErrorResponse};
pub use telemetry::{init_telemetry, LogFormat};
