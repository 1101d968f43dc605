use chrono::{DateTime, Utc};
use folio_core::models::{
    normalize_search_term, AssetKey, NewProject, Page, PageRequest, Project, ProjectImage,
};
use folio_core::{AppError, Config};
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::memory::InMemoryProjectRepository;
use super::pool::create_pool;

/// Persistence for the project aggregate.
///
/// `save` writes the project and all of its image rows in one transaction.
#[async_trait::async_trait]
pub trait ProjectRepositoryTrait: Send + Sync {
    async fn save(&self, project: NewProject) -> Result<Project, AppError>;

    /// Case-insensitive substring search over title, unique id, description and
    /// service type, newest first. A blank term matches everything.
    async fn search(&self, term: Option<&str>, page: PageRequest)
        -> Result<Page<Project>, AppError>;

    async fn find_by_unique_id(&self, unique_id: Uuid) -> Result<Option<Project>, AppError>;

    async fn exists_by_unique_id(&self, unique_id: Uuid) -> Result<bool, AppError>;

    /// Returns whether a project was removed. Image rows go with it.
    async fn delete_by_unique_id(&self, unique_id: Uuid) -> Result<bool, AppError>;
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    unique_id: Uuid,
    title: String,
    description: Option<String>,
    service_type: String,
    thumbnail_image: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProjectImageRow {
    id: i64,
    project_id: i64,
    image_url: String,
    position: i32,
}

impl ProjectRow {
    fn into_project(self, images: Vec<ProjectImage>) -> Project {
        Project {
            id: self.id,
            unique_id: self.unique_id,
            title: self.title,
            description: self.description,
            service_type: self.service_type,
            thumbnail_image: AssetKey::new(self.thumbnail_image),
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn db_error(e: sqlx::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// Escape LIKE wildcards so the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const PROJECT_COLUMNS: &str =
    "id, unique_id, title, description, service_type, thumbnail_image, created_at, updated_at";

const SEARCH_FILTER: &str = r#"
    $1::text IS NULL
    OR LOWER(title) LIKE $1
    OR LOWER(unique_id::text) LIKE $1
    OR LOWER(COALESCE(description, '')) LIKE $1
    OR LOWER(service_type) LIKE $1
"#;

#[derive(Clone)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_images(
        &self,
        project_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<ProjectImage>>, AppError> {
        let mut grouped: HashMap<i64, Vec<ProjectImage>> = HashMap::new();
        if project_ids.is_empty() {
            return Ok(grouped);
        }

        let rows = sqlx::query_as::<Postgres, ProjectImageRow>(
            r#"
            SELECT id, project_id, image_url, position
            FROM project_images
            WHERE project_id = ANY($1)
            ORDER BY project_id, position
            "#,
        )
        .bind(project_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        for row in rows {
            grouped.entry(row.project_id).or_default().push(ProjectImage {
                id: row.id,
                image_url: AssetKey::new(row.image_url),
                position: row.position,
            });
        }
        Ok(grouped)
    }
}

#[async_trait::async_trait]
impl ProjectRepositoryTrait for PostgresProjectRepository {
    #[tracing::instrument(skip(self, project), fields(
        db.system = "postgresql",
        db.table = "projects",
        db.operation = "insert",
        project.unique_id = %project.unique_id,
        project.images = project.images.len()
    ))]
    async fn save(&self, project: NewProject) -> Result<Project, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<Postgres, ProjectRow>(&format!(
            r#"
            INSERT INTO projects (unique_id, title, description, service_type, thumbnail_image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        ))
        .bind(project.unique_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.service_type)
        .bind(project.thumbnail_image.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, unique_id = %project.unique_id, "Failed to insert project");
            db_error(e)
        })?;

        let mut images = Vec::with_capacity(project.images.len());
        for (position, key) in project.images.iter().enumerate() {
            let position = position as i32;
            let id = sqlx::query_scalar::<Postgres, i64>(
                r#"
                INSERT INTO project_images (project_id, image_url, position)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(row.id)
            .bind(key.as_str())
            .bind(position)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

            images.push(ProjectImage {
                id,
                image_url: key.clone(),
                position,
            });
        }

        tx.commit().await.map_err(db_error)?;

        Ok(row.into_project(images))
    }

    #[tracing::instrument(skip(self), fields(db.system = "postgresql", db.table = "projects", db.operation = "select"))]
    async fn search(
        &self,
        term: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Project>, AppError> {
        let pattern = normalize_search_term(term).map(|t| like_pattern(&t));

        let total = sqlx::query_scalar::<Postgres, i64>(&format!(
            "SELECT COUNT(*) FROM projects WHERE {}",
            SEARCH_FILTER
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        let rows = sqlx::query_as::<Postgres, ProjectRow>(&format!(
            r#"
            SELECT {}
            FROM projects
            WHERE {}
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            PROJECT_COLUMNS, SEARCH_FILTER
        ))
        .bind(&pattern)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut images = self.load_images(&ids).await?;

        let content = rows
            .into_iter()
            .map(|row| {
                let project_images = images.remove(&row.id).unwrap_or_default();
                row.into_project(project_images)
            })
            .collect();

        Ok(Page::new(content, page, total))
    }

    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "select", db.record_id = %unique_id))]
    async fn find_by_unique_id(&self, unique_id: Uuid) -> Result<Option<Project>, AppError> {
        let row = sqlx::query_as::<Postgres, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE unique_id = $1",
            PROJECT_COLUMNS
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => {
                let mut images = self.load_images(&[row.id]).await?;
                let project_images = images.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_project(project_images)))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "select", db.record_id = %unique_id))]
    async fn exists_by_unique_id(&self, unique_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE unique_id = $1)",
        )
        .bind(unique_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "delete", db.record_id = %unique_id))]
    async fn delete_by_unique_id(&self, unique_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE unique_id = $1")
            .bind(unique_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the project repository based on configuration
pub async fn create_project_repository(
    config: &Config,
) -> Result<Arc<dyn ProjectRepositoryTrait>, AppError> {
    match config.database_url() {
        Some(_) => {
            tracing::info!("Initializing PostgreSQL project repository");
            let pool = create_pool(config).await?;
            Ok(Arc::new(PostgresProjectRepository::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory project repository");
            Ok(Arc::new(InMemoryProjectRepository::new()))
        }
    }
}
