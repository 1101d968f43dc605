use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::asset::{Asset, AssetKey};

/// Persisted project aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    /// Correlation id of the creation; also names the store folder.
    pub unique_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub service_type: String,
    pub thumbnail_image: AssetKey,
    /// Gallery images in input order.
    pub images: Vec<ProjectImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Every store key owned by this aggregate, thumbnail first.
    pub fn asset_keys(&self) -> Vec<AssetKey> {
        std::iter::once(self.thumbnail_image.clone())
            .chain(self.images.iter().map(|i| i.image_url.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectImage {
    pub id: i64,
    pub image_url: AssetKey,
    pub position: i32,
}

/// Unsaved aggregate handed to the repository.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub unique_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub service_type: String,
    pub thumbnail_image: AssetKey,
    pub images: Vec<AssetKey>,
}

/// Input of a project creation.
#[derive(Debug, Clone, Validate)]
pub struct CreateProjectRequest {
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom(function = "crate::validation::not_blank"))]
    pub service_type: String,
    /// Checked by `validate_create_project`.
    pub thumbnail: Asset,
    pub images: Vec<Asset>,
}

impl CreateProjectRequest {
    /// Gallery assets that will actually be uploaded; empty entries are skipped.
    pub fn gallery(&self) -> impl Iterator<Item = &Asset> {
        self.images.iter().filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: i64,
    pub unique_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub service_type: String,
    pub thumbnail_image: AssetKey,
    pub images: Vec<ProjectImageDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectImageDto {
    pub id: i64,
    pub image_url: AssetKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Project {
        let now = Utc::now();
        Project {
            id: 7,
            unique_id: Uuid::new_v4(),
            title: "Kitchen".to_string(),
            description: None,
            service_type: "renovation".to_string(),
            thumbnail_image: AssetKey::new("t"),
            images: vec![
                ProjectImage {
                    id: 1,
                    image_url: AssetKey::new("a"),
                    position: 0,
                },
                ProjectImage {
                    id: 2,
                    image_url: AssetKey::new("b"),
                    position: 1,
                },
            ],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn asset_keys_lists_thumbnail_then_gallery() {
        let keys: Vec<String> = sample()
            .asset_keys()
            .into_iter()
            .map(AssetKey::into_inner)
            .collect();
        assert_eq!(keys, vec!["t", "a", "b"]);
    }

    #[test]
    fn gallery_skips_empty_entries() {
        let request = CreateProjectRequest {
            title: "t".to_string(),
            description: None,
            service_type: "s".to_string(),
            thumbnail: Asset::new("t.png", vec![1u8]),
            images: vec![
                Asset::new("a.png", vec![1u8]),
                Asset::new("empty.png", Vec::<u8>::new()),
                Asset::new("b.png", vec![2u8]),
            ],
        };
        let names: Vec<&str> = request.gallery().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn dto_uses_camel_case_and_omits_missing_description() {
        let now = Utc::now();
        let dto = ProjectDto {
            id: 1,
            unique_id: Uuid::nil(),
            title: "t".to_string(),
            description: None,
            service_type: "s".to_string(),
            thumbnail_image: AssetKey::new("k"),
            images: vec![],
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("serviceType").is_some());
        assert!(json.get("thumbnailImage").is_some());
        assert!(json.get("description").is_none());
    }
}
