//! Mapping between the creation request, the uploaded assets and the stored aggregate.

use folio_core::models::{
    CreateProjectRequest, NewProject, Project, ProjectDto, ProjectImage, ProjectImageDto,
};

use crate::orchestrator::UploadedAssets;

/// Unsaved aggregate for a fully uploaded creation. Gallery keys keep input order.
pub fn assemble(request: &CreateProjectRequest, uploaded: &UploadedAssets) -> NewProject {
    NewProject {
        unique_id: uploaded.correlation_id,
        title: request.title.trim().to_string(),
        description: request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        service_type: request.service_type.trim().to_string(),
        thumbnail_image: uploaded.thumbnail.clone(),
        images: uploaded.gallery.clone(),
    }
}

pub fn to_dto(project: Project) -> ProjectDto {
    let mut images = project.images;
    images.sort_by_key(|i| i.position);

    ProjectDto {
        id: project.id,
        unique_id: project.unique_id,
        title: project.title,
        description: project.description,
        service_type: project.service_type,
        thumbnail_image: project.thumbnail_image,
        images: images.into_iter().map(image_dto).collect(),
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}

fn image_dto(image: ProjectImage) -> ProjectImageDto {
    ProjectImageDto {
        id: image.id,
        image_url: image.image_url,
    }
}
