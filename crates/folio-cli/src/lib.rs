use std::path::Path;

use anyhow::Context;
use folio_core::models::Asset;
use serde::Serialize;

/// Read a file into an asset named after the file.
pub async fn read_asset(path: &Path) -> anyhow::Result<Asset> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());
    Ok(Asset::new(filename, data))
}

pub fn to_json(value: &impl Serialize) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Serialize response")
}
