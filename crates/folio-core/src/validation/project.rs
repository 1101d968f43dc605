//! Project creation input validation
//!
//! Runs before any upload is scheduled; a failure here has no side effects.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{Asset, CreateProjectRequest};

/// Field-keyed validation failures (`title`, `serviceType`, `thumbnail`).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::default();
        for (field, errs) in errors.field_errors() {
            let name: &str = field.as_ref();
            let key = camel_case(name);
            let message = match errs.first() {
                Some(e) => match &e.message {
                    Some(m) => m.to_string(),
                    None if e.code == "required" => format!("{} is required", key),
                    None => format!("{} is invalid", key),
                },
                None => format!("{} is invalid", key),
            };
            fields.insert(key, message);
        }
        fields
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

pub fn non_empty_asset(asset: &Asset) -> Result<(), ValidationError> {
    if asset.is_empty() {
        return Err(
            ValidationError::new("required").with_message(Cow::from("thumbnail file is required"))
        );
    }
    Ok(())
}

/// Validate a creation request, returning every failing field at once.
pub fn validate_create_project(request: &CreateProjectRequest) -> Result<(), FieldErrors> {
    let mut fields = match request.validate() {
        Ok(()) => FieldErrors::default(),
        Err(errors) => FieldErrors::from(errors),
    };

    if let Err(e) = non_empty_asset(&request.thumbnail) {
        let message = e
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "thumbnail is required".to_string());
        fields.insert("thumbnail", message);
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, service_type: &str, thumbnail: &[u8]) -> CreateProjectRequest {
        CreateProjectRequest {
            title: title.to_string(),
            description: None,
            service_type: service_type.to_string(),
            thumbnail: Asset::new("thumb.png", thumbnail.to_vec()),
            images: vec![],
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_create_project(&request("Roof", "repair", b"x")).is_ok());
    }

    #[test]
    fn blank_fields_are_reported_by_camel_case_key() {
        let errors = validate_create_project(&request("  ", "", b"")).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("title"), Some("title is required"));
        assert_eq!(errors.get("serviceType"), Some("serviceType is required"));
        assert_eq!(errors.get("thumbnail"), Some("thumbnail file is required"));
    }

    #[test]
    fn missing_description_and_images_are_allowed() {
        let mut req = request("Deck", "build", b"x");
        req.images = vec![Asset::new("empty.png", Vec::<u8>::new())];
        assert!(validate_create_project(&req).is_ok());
    }

    #[test]
    fn empty_thumbnail_alone_is_reported() {
        let errors = validate_create_project(&request("Roof", "repair", b"")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("thumbnail"), Some("thumbnail file is required"));
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("service_type"), "serviceType");
        assert_eq!(camel_case("title"), "title");
    }
}
