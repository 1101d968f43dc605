//! Validation modules

pub mod project;

pub use project::{non_empty_asset, not_blank, validate_create_project, FieldErrors};
