//! Project creation and listing.

use std::sync::Arc;
use std::time::Instant;

use folio_core::models::{CreateProjectRequest, Page, PageRequest, ProjectDto};
use folio_core::{validate_create_project, AppError};
use folio_db::ProjectRepositoryTrait;
use uuid::Uuid;

use crate::assembler;
use crate::error::CreateProjectError;
use crate::orchestrator::UploadOrchestrator;

pub struct ProjectService {
    orchestrator: UploadOrchestrator,
    repository: Arc<dyn ProjectRepositoryTrait>,
}

impl ProjectService {
    pub fn new(
        orchestrator: UploadOrchestrator,
        repository: Arc<dyn ProjectRepositoryTrait>,
    ) -> Self {
        Self {
            orchestrator,
            repository,
        }
    }

    pub fn orchestrator(&self) -> &UploadOrchestrator {
        &self.orchestrator
    }

    pub fn repository(&self) -> &Arc<dyn ProjectRepositoryTrait> {
        &self.repository
    }

    /// Upload every asset of the request and persist the project, all or nothing.
    ///
    /// Validation failures are reported before anything is uploaded. Any later failure
    /// deletes the assets uploaded so far and leaves no project row.
    pub async fn create_project_with_assets(
        &self,
        request: CreateProjectRequest,
    ) -> Result<ProjectDto, CreateProjectError> {
        validate_create_project(&request).map_err(CreateProjectError::Validation)?;

        let started = Instant::now();
        let correlation_id = Uuid::new_v4();

        let uploaded = self
            .orchestrator
            .upload_assets(correlation_id, &request.thumbnail, request.gallery())
            .await?;

        let project = assembler::assemble(&request, &uploaded);
        let saved = match self.repository.save(project).await {
            Ok(saved) => saved,
            Err(source) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    error = %source,
                    "Saving project failed, removing uploaded assets"
                );
                let cleanup = self.orchestrator.compensate(uploaded.keys()).await;
                return Err(CreateProjectError::Persistence { source, cleanup });
            }
        };

        tracing::info!(
            project_id = saved.id,
            correlation_id = %correlation_id,
            images = saved.images.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Created project"
        );

        Ok(assembler::to_dto(saved))
    }

    /// Newest first. `page < 0` reads the first page and `size < 1` uses the default size.
    pub async fn find_all_projects(
        &self,
        search: Option<&str>,
        page: i64,
        size: i64,
    ) -> Result<Page<ProjectDto>, AppError> {
        let page = self
            .repository
            .search(search, PageRequest::new(page, size))
            .await?;
        Ok(page.map(assembler::to_dto))
    }

    pub async fn find_by_unique_id(&self, unique_id: Uuid) -> Result<ProjectDto, AppError> {
        self.repository
            .find_by_unique_id(unique_id)
            .await?
            .map(assembler::to_dto)
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", unique_id)))
    }
}
