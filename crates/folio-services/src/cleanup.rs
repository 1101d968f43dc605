//! Best-effort compensation: delete every uploaded key of a failed creation.

use std::fmt;
use std::time::Duration;

use folio_core::models::AssetKey;
use folio_storage::{AssetUploader, DeleteOutcome};
use futures::future::join_all;

use crate::progress::UploadedKeys;

/// Outcome of one compensation pass. Individual delete failures are counted, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: usize,
    pub deleted: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl CleanupReport {
    /// Keys that are gone from the store, whether we deleted them or they were already missing.
    pub fn cleaned(&self) -> usize {
        self.deleted + self.not_found
    }

    pub fn merge(self, other: CleanupReport) -> CleanupReport {
        CleanupReport {
            attempted: self.attempted + other.attempted,
            deleted: self.deleted + other.deleted,
            not_found: self.not_found + other.not_found,
            failed: self.failed + other.failed,
        }
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cleaned {} of {} uploaded assets, {} deletes failed",
            self.cleaned(),
            self.attempted,
            self.failed
        )
    }
}

/// Drain the record and delete what it held.
pub async fn compensate(
    uploader: &AssetUploader,
    keys: &UploadedKeys,
    per_delete_timeout: Duration,
) -> CleanupReport {
    compensate_keys(uploader, keys.drain(), per_delete_timeout).await
}

/// Delete each key once, concurrently, each bounded by `per_delete_timeout`.
pub async fn compensate_keys(
    uploader: &AssetUploader,
    keys: Vec<AssetKey>,
    per_delete_timeout: Duration,
) -> CleanupReport {
    let mut report = CleanupReport {
        attempted: keys.len(),
        ..CleanupReport::default()
    };
    if keys.is_empty() {
        return report;
    }

    let deletes = keys.iter().map(|key| async move {
        let result = tokio::time::timeout(per_delete_timeout, uploader.delete_by_key(key)).await;
        (key, result)
    });

    for (key, result) in join_all(deletes).await {
        match result {
            Ok(Ok(DeleteOutcome::Deleted)) => report.deleted += 1,
            Ok(Ok(DeleteOutcome::NotFound)) => {
                tracing::debug!(key = %key, "Cleanup target already absent");
                report.not_found += 1;
            }
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Cleanup delete failed");
                report.failed += 1;
            }
            Err(_) => {
                tracing::warn!(
                    key = %key,
                    timeout_ms = per_delete_timeout.as_millis() as u64,
                    "Cleanup delete timed out"
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        attempted = report.attempted,
        deleted = report.deleted,
        not_found = report.not_found,
        failed = report.failed,
        "Compensating cleanup finished"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::models::Asset;
    use folio_storage::{AssetStore, MemoryStorage, UploadPolicy};
    use std::sync::Arc;

    #[tokio::test]
    async fn deletes_every_recorded_key_once() {
        let store = Arc::new(MemoryStorage::new());
        let uploader = AssetUploader::new(store.clone(), UploadPolicy::default());
        let keys = UploadedKeys::new();

        for name in ["a.png", "b.png", "c.png"] {
            let key = store
                .put("uploads/x", &Asset::new(name, vec![1u8]))
                .await
                .unwrap();
            keys.push(key);
        }
        // already gone before cleanup runs
        keys.push(AssetKey::new("uploads/x/missing.png"));

        let report = compensate(&uploader, &keys, Duration::from_secs(1)).await;
        assert_eq!(
            report,
            CleanupReport {
                attempted: 4,
                deleted: 3,
                not_found: 1,
                failed: 0
            }
        );
        assert!(store.is_empty().await);

        let again = compensate(&uploader, &keys, Duration::from_secs(1)).await;
        assert_eq!(again.attempted, 0);
    }

    #[test]
    fn report_display_and_merge() {
        let report = CleanupReport {
            attempted: 3,
            deleted: 1,
            not_found: 1,
            failed: 1,
        }
        .merge(CleanupReport {
            attempted: 1,
            deleted: 1,
            ..CleanupReport::default()
        });
        assert_eq!(report.cleaned(), 3);
        assert_eq!(
            report.to_string(),
            "cleaned 3 of 4 uploaded assets, 1 deletes failed"
        );
    }
}
