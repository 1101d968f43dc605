//! In-process project repository, used when no database is configured and by tests.

use chrono::Utc;
use folio_core::models::{normalize_search_term, NewProject, Page, PageRequest, Project, ProjectImage};
use folio_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::project::ProjectRepositoryTrait;

#[derive(Default)]
struct Tables {
    projects: Vec<Project>,
    next_project_id: i64,
    next_image_id: i64,
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    tables: RwLock<Tables>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.tables.read().await.projects.len()
    }
}

fn matches(project: &Project, needle: &str) -> bool {
    project.title.to_lowercase().contains(needle)
        || project.unique_id.to_string().contains(needle)
        || project
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(needle))
            .unwrap_or(false)
        || project.service_type.to_lowercase().contains(needle)
}

#[async_trait::async_trait]
impl ProjectRepositoryTrait for InMemoryProjectRepository {
    async fn save(&self, project: NewProject) -> Result<Project, AppError> {
        let mut tables = self.tables.write().await;

        if tables.projects.iter().any(|p| p.unique_id == project.unique_id) {
            return Err(AppError::Database(format!(
                "duplicate unique_id {}",
                project.unique_id
            )));
        }

        tables.next_project_id += 1;
        let id = tables.next_project_id;

        let mut images = Vec::with_capacity(project.images.len());
        for (position, key) in project.images.into_iter().enumerate() {
            tables.next_image_id += 1;
            images.push(ProjectImage {
                id: tables.next_image_id,
                image_url: key,
                position: position as i32,
            });
        }

        let now = Utc::now();
        let saved = Project {
            id,
            unique_id: project.unique_id,
            title: project.title,
            description: project.description,
            service_type: project.service_type,
            thumbnail_image: project.thumbnail_image,
            images,
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(saved.clone());

        Ok(saved)
    }

    async fn search(
        &self,
        term: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Project>, AppError> {
        let needle = normalize_search_term(term).map(|t| t.to_lowercase());
        let tables = self.tables.read().await;

        let mut hits: Vec<&Project> = tables
            .projects
            .iter()
            .filter(|p| needle.as_deref().map(|n| matches(p, n)).unwrap_or(true))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = hits.len() as i64;
        let content = hits
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.size).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(Page::new(content, page, total))
    }

    async fn find_by_unique_id(&self, unique_id: Uuid) -> Result<Option<Project>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .iter()
            .find(|p| p.unique_id == unique_id)
            .cloned())
    }

    async fn exists_by_unique_id(&self, unique_id: Uuid) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().any(|p| p.unique_id == unique_id))
    }

    async fn delete_by_unique_id(&self, unique_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.projects.len();
        tables.projects.retain(|p| p.unique_id != unique_id);
        Ok(tables.projects.len() < before)
    }
}
