//! Wiring of the project service from configuration.

use std::sync::Arc;

use anyhow::Context;
use folio_core::Config;
use folio_db::create_project_repository;
use folio_storage::{create_storage, AssetUploader, UploadPolicy};

use crate::orchestrator::{OrchestratorConfig, UploadOrchestrator};
use crate::pool::{PoolConfig, UploadPool};
use crate::service::ProjectService;

/// Build the project service. The returned pool is shared by every creation and should
/// be shut down when the process exits.
pub async fn build_project_service(
    config: &Config,
) -> anyhow::Result<(ProjectService, Arc<UploadPool>)> {
    let store = create_storage(config)
        .await
        .context("Failed to initialize asset store")?;
    tracing::info!(backend = %store.backend_type(), "Asset store initialized");

    let repository = create_project_repository(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize project repository: {}", e))?;

    let pool = Arc::new(UploadPool::new(PoolConfig::from_config(config)));
    let uploader = Arc::new(AssetUploader::new(store, UploadPolicy::from_config(config)));
    let orchestrator = UploadOrchestrator::new(
        pool.clone(),
        uploader,
        OrchestratorConfig::from_config(config),
    );

    Ok((ProjectService::new(orchestrator, repository), pool))
}
