//! One gallery asset upload, run on the upload pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use folio_core::models::{Asset, AssetKey};
use folio_storage::{AssetUploader, StorageError};

use crate::progress::UploadedKeys;

/// What a pooled upload produced.
#[derive(Debug)]
pub enum UploadOutcome {
    Success(AssetKey),
    Failure(StorageError),
    /// Never produced a key because the batch was cancelled or the pool went away.
    Cancelled,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            UploadOutcome::Success(_) => "success",
            UploadOutcome::Failure(_) => "failure",
            UploadOutcome::Cancelled => "cancelled",
        }
    }
}

/// Uploads in flight for one creation, and the highest value seen.
#[derive(Debug, Default)]
pub struct InflightGauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InflightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    /// Count an upload as started until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>, seq: u64, size_bytes: usize) -> InflightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        tracing::info!(seq, size_kb = size_bytes / 1024, inflight = now, "UPLOAD-START");
        InflightGuard {
            gauge: Arc::clone(self),
            seq,
            started: Instant::now(),
        }
    }
}

/// Logs `UPLOAD-END` on drop, including when the upload is aborted mid-flight.
pub struct InflightGuard {
    gauge: Arc<InflightGauge>,
    seq: u64,
    started: Instant,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let after = self.gauge.current.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::info!(
            seq = self.seq,
            took_ms = self.started.elapsed().as_millis() as u64,
            inflight = after,
            "UPLOAD-END"
        );
    }
}

pub struct UploadTask {
    pub seq: u64,
    pub folder: String,
    pub asset: Asset,
    pub keys: Arc<UploadedKeys>,
    pub gauge: Arc<InflightGauge>,
}

impl UploadTask {
    /// Upload the asset. A successful key is recorded before the outcome is reported.
    pub async fn run(self, uploader: Arc<AssetUploader>) -> UploadOutcome {
        let UploadTask {
            seq,
            folder,
            asset,
            keys,
            gauge,
        } = self;

        let _guard = gauge.enter(seq, asset.size_bytes());

        match uploader.upload(&folder, &asset).await {
            Ok(key) => {
                keys.push(key.clone());
                UploadOutcome::Success(key)
            }
            Err(e) => {
                tracing::warn!(
                    seq,
                    filename = %asset.filename,
                    error = %e,
                    "Gallery upload failed"
                );
                UploadOutcome::Failure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_storage::{MemoryStorage, UploadPolicy};

    #[test]
    fn gauge_tracks_max_and_releases_on_drop() {
        let gauge = Arc::new(InflightGauge::new());
        let a = gauge.enter(1, 2048);
        let b = gauge.enter(2, 4096);
        assert_eq!(gauge.current(), 2);
        drop(a);
        let c = gauge.enter(3, 1024);
        drop(b);
        drop(c);
        assert_eq!(gauge.current(), 0);
        assert_eq!(gauge.max(), 2);
    }

    #[tokio::test]
    async fn successful_run_records_key() {
        let uploader = Arc::new(AssetUploader::new(
            Arc::new(MemoryStorage::new()),
            UploadPolicy::default(),
        ));
        let keys = Arc::new(UploadedKeys::new());
        let task = UploadTask {
            seq: 1,
            folder: "uploads/t".to_string(),
            asset: Asset::new("a.png", vec![1u8; 3]),
            keys: keys.clone(),
            gauge: Arc::new(InflightGauge::new()),
        };

        let outcome = task.run(uploader).await;
        match outcome {
            UploadOutcome::Success(key) => assert_eq!(keys.snapshot(), vec![key]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_run_records_nothing() {
        let uploader = Arc::new(AssetUploader::new(
            Arc::new(MemoryStorage::new()),
            UploadPolicy::default(),
        ));
        let keys = Arc::new(UploadedKeys::new());
        let task = UploadTask {
            seq: 1,
            folder: "uploads/t".to_string(),
            asset: Asset::new("empty.png", Vec::<u8>::new()),
            keys: keys.clone(),
            gauge: Arc::new(InflightGauge::new()),
        };

        assert!(matches!(task.run(uploader).await, UploadOutcome::Failure(_)));
        assert!(keys.is_empty());
    }
}
