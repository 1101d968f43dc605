//! Shared key generation for storage backends.
//!
//! Folder format: `{base_folder}/{sub_folder}`, or just `{base_folder}` for a blank sub folder.
//! Key format: `{folder}/{uuid}.{ext}`.

use folio_core::models::{Asset, AssetKey};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Join the base folder and a per-creation sub folder.
pub fn folder_path(base_folder: &str, sub_folder: &str) -> String {
    let base = base_folder.trim_matches('/');
    let sub = sub_folder.trim().trim_matches('/');
    match (base.is_empty(), sub.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => sub.to_string(),
        (false, false) => format!("{}/{}", base, sub),
    }
}

/// Generate a fresh key for the asset inside `folder`.
///
/// All backends must use this format for consistency.
pub fn generate_asset_key(folder: &str, asset: &Asset) -> AssetKey {
    let name = format!("{}.{}", Uuid::new_v4(), asset.extension());
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        AssetKey::new(name)
    } else {
        AssetKey::new(format!("{}/{}", folder, name))
    }
}

/// Reject keys that could escape the store root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_joins_base_and_sub() {
        assert_eq!(folder_path("uploads", "abc"), "uploads/abc");
        assert_eq!(folder_path("uploads/", "/abc/"), "uploads/abc");
        assert_eq!(folder_path("uploads", "  "), "uploads");
        assert_eq!(folder_path("", "abc"), "abc");
    }

    #[test]
    fn generated_keys_are_unique_and_keep_extension() {
        let asset = Asset::new("photo.PNG", vec![1u8, 2, 3]);
        let a = generate_asset_key("uploads/x", &asset);
        let b = generate_asset_key("uploads/x", &asset);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("uploads/x/"));
        assert!(a.as_str().ends_with(".png"));
        assert!(validate_key(a.as_str()).is_ok());
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }
}
