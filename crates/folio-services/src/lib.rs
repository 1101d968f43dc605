//! Folio Services Library
//!
//! Project creation with parallel asset uploads: the process-wide bounded upload pool,
//! per-asset upload tasks, the orchestrator that joins them under one deadline and
//! compensates on failure, and the project service that persists the aggregate.

pub mod assembler;
pub mod cleanup;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod service;
pub mod setup;
pub mod task;

pub use cleanup::CleanupReport;
pub use error::{CreateProjectError, UploadStage};
pub use orchestrator::{OrchestratorConfig, UploadOrchestrator, UploadedAssets};
pub use pool::{PoolConfig, PoolError, PoolSnapshot, TaskControl, UploadHandle, UploadPool};
pub use progress::UploadedKeys;
pub use service::ProjectService;
pub use setup::build_project_service;
pub use task::{InflightGauge, UploadOutcome, UploadTask};
