//! Parallel upload of one creation's assets with compensating cleanup.
//!
//! Gallery uploads fan out onto the shared [`UploadPool`] while the thumbnail uploads on
//! the calling task. The gallery is joined under a single deadline and fails fast. That
//! deadline covers the gallery join only: the thumbnail upload has no time limit here and
//! is bounded by the store client's own request timeouts. On any failure the batch is
//! wound down before cleanup runs:
//!
//! 1. every unfinished upload is cancelled, so queued ones never start;
//! 2. uploads already in flight get `settle_grace` to finish and record their keys;
//! 3. whatever is still running after that is aborted;
//! 4. every recorded key is deleted once.
//!
//! A put that lands in the store after its upload future was aborted is never learned
//! about and leaks. Objects live under `{base_folder}/{correlation_id}`, so such leftovers
//! can be found per creation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use folio_core::models::{Asset, AssetKey};
use folio_core::Config;
use folio_storage::AssetUploader;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use uuid::Uuid;

use crate::cleanup::{self, CleanupReport};
use crate::error::{CreateProjectError, UploadStage};
use crate::pool::{PoolError, UploadHandle, UploadPool};
use crate::progress::UploadedKeys;
use crate::task::{InflightGauge, UploadOutcome, UploadTask};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline for the whole gallery batch.
    pub join_timeout: Duration,
    /// How long in-flight uploads may keep running once the batch has failed.
    pub settle_grace: Duration,
    /// Bound on each cleanup delete.
    pub cleanup_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(120),
            settle_grace: Duration::from_millis(2000),
            cleanup_timeout: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            join_timeout: config.parallel_timeout(),
            settle_grace: config.settle_grace(),
            cleanup_timeout: config.cleanup_timeout(),
        }
    }
}

/// Every asset of a creation, uploaded and not yet owned by a persisted project.
#[derive(Debug)]
pub struct UploadedAssets {
    pub correlation_id: Uuid,
    pub folder: String,
    pub thumbnail: AssetKey,
    /// In input order.
    pub gallery: Vec<AssetKey>,
    pub max_inflight: usize,
    keys: Arc<UploadedKeys>,
}

impl UploadedAssets {
    pub fn keys(&self) -> &UploadedKeys {
        &self.keys
    }
}

enum JoinFailure {
    Upload(folio_storage::StorageError),
    Abandoned(u64),
}

pub struct UploadOrchestrator {
    pool: Arc<UploadPool>,
    uploader: Arc<AssetUploader>,
    config: OrchestratorConfig,
}

impl UploadOrchestrator {
    pub fn new(
        pool: Arc<UploadPool>,
        uploader: Arc<AssetUploader>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            pool,
            uploader,
            config,
        }
    }

    pub fn pool(&self) -> &Arc<UploadPool> {
        &self.pool
    }

    pub fn uploader(&self) -> &Arc<AssetUploader> {
        &self.uploader
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Upload the thumbnail and every non-empty gallery image under
    /// `{base_folder}/{correlation_id}`.
    ///
    /// Either every asset is stored and returned, or the batch is wound down, every key it
    /// recorded is deleted, and the original cause is returned.
    #[tracing::instrument(skip_all, fields(correlation_id = %correlation_id))]
    pub async fn upload_assets<'a, I>(
        &self,
        correlation_id: Uuid,
        thumbnail: &Asset,
        images: I,
    ) -> Result<UploadedAssets, CreateProjectError>
    where
        I: IntoIterator<Item = &'a Asset>,
    {
        let started = Instant::now();
        let folder = self.uploader.folder_for(&correlation_id.to_string());
        let keys = Arc::new(UploadedKeys::new());
        let gauge = Arc::new(InflightGauge::new());

        let mut handles: Vec<UploadHandle> = Vec::new();
        for asset in images.into_iter().filter(|a| !a.is_empty()) {
            let seq = handles.len() as u64 + 1;
            let task = UploadTask {
                seq,
                folder: folder.clone(),
                asset: asset.clone(),
                keys: keys.clone(),
                gauge: gauge.clone(),
            };
            match self.pool.submit(seq, task.run(self.uploader.clone())).await {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    tracing::error!(seq, error = %source, "Failed to schedule gallery upload");
                    self.wind_down(&mut handles, Duration::ZERO).await;
                    let cleanup = self.compensate(&keys).await;
                    return Err(CreateProjectError::Scheduling { source, cleanup });
                }
            }
        }

        let snapshot = self.pool.snapshot();
        tracing::info!(
            scheduled = handles.len(),
            workers = snapshot.workers,
            active = snapshot.active,
            queued = snapshot.queued,
            completed = snapshot.completed,
            "Upload pool state"
        );

        let thumbnail_start = Instant::now();
        let thumbnail_key = match self.uploader.upload(&folder, thumbnail).await {
            Ok(key) => {
                keys.push(key.clone());
                tracing::info!(
                    key = %key,
                    size_kb = thumbnail.size_bytes() / 1024,
                    duration_ms = thumbnail_start.elapsed().as_secs_f64() * 1000.0,
                    "Thumbnail uploaded"
                );
                key
            }
            Err(source) => {
                tracing::warn!(error = %source, "Thumbnail upload failed");
                self.wind_down(&mut handles, Duration::ZERO).await;
                let cleanup = self.compensate(&keys).await;
                return Err(CreateProjectError::Upload {
                    stage: UploadStage::Thumbnail,
                    source,
                    cleanup,
                });
            }
        };

        let mut gallery: Vec<Option<AssetKey>> = vec![None; handles.len()];
        let joined = {
            let mut pending: FuturesUnordered<_> = handles
                .iter_mut()
                .enumerate()
                .map(|(idx, handle)| async move { (idx, handle.seq(), handle.wait().await) })
                .collect();

            tokio::time::timeout(self.config.join_timeout, async {
                while let Some((idx, seq, outcome)) = pending.next().await {
                    match outcome {
                        UploadOutcome::Success(key) => gallery[idx] = Some(key),
                        UploadOutcome::Failure(e) => return Err(JoinFailure::Upload(e)),
                        UploadOutcome::Cancelled => return Err(JoinFailure::Abandoned(seq)),
                    }
                }
                Ok(())
            })
            .await
        };

        let failure = match joined {
            Ok(Ok(())) => None,
            Ok(Err(JoinFailure::Upload(source))) => Some(CreateProjectError::Upload {
                stage: UploadStage::Gallery,
                source,
                cleanup: CleanupReport::default(),
            }),
            Ok(Err(JoinFailure::Abandoned(seq))) => Some(CreateProjectError::Scheduling {
                source: PoolError::Abandoned { seq },
                cleanup: CleanupReport::default(),
            }),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.join_timeout.as_millis() as u64,
                    unfinished = handles.iter().filter(|h| !h.is_finished()).count(),
                    "Gallery uploads exceeded deadline"
                );
                Some(CreateProjectError::Timeout {
                    after: self.config.join_timeout,
                    cleanup: CleanupReport::default(),
                })
            }
        };

        if let Some(error) = failure {
            self.wind_down(&mut handles, self.config.settle_grace).await;
            let report = self.compensate(&keys).await;
            return Err(with_cleanup(error, report));
        }

        let gallery: Vec<AssetKey> = gallery.into_iter().flatten().collect();
        tracing::info!(
            gallery = gallery.len(),
            max_inflight = gauge.max(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "UPLOAD-SUMMARY"
        );

        Ok(UploadedAssets {
            correlation_id,
            folder,
            thumbnail: thumbnail_key,
            gallery,
            max_inflight: gauge.max(),
            keys,
        })
    }

    /// Delete every key still recorded for a creation.
    pub async fn compensate(&self, keys: &UploadedKeys) -> CleanupReport {
        cleanup::compensate(&self.uploader, keys, self.config.cleanup_timeout).await
    }

    /// Stop every unfinished upload of the batch. Returns once no upload of it can still
    /// record a key.
    async fn wind_down(&self, handles: &mut [UploadHandle], grace: Duration) {
        // Cancel everything first; only then is `has_started` conclusive.
        for handle in handles.iter().filter(|h| !h.is_finished()) {
            handle.control().cancel();
        }
        join_all(
            handles
                .iter_mut()
                .filter(|h| !h.is_finished() && h.control().has_started())
                .map(|h| settle(h, grace)),
        )
        .await;
    }
}

async fn settle(handle: &mut UploadHandle, grace: Duration) {
    let seq = handle.seq();
    let control = handle.control();
    let wait = handle.wait();
    tokio::pin!(wait);

    tokio::select! {
        outcome = &mut wait => {
            tracing::debug!(seq, outcome = outcome.label(), "Upload settled after batch failure");
        }
        _ = tokio::time::sleep(grace) => {
            if !grace.is_zero() {
                tracing::warn!(
                    seq,
                    grace_ms = grace.as_millis() as u64,
                    "Upload still running after settle grace, aborting"
                );
            }
            control.abort();
            wait.await;
        }
    }
}

fn with_cleanup(error: CreateProjectError, report: CleanupReport) -> CreateProjectError {
    match error {
        CreateProjectError::Upload { stage, source, .. } => CreateProjectError::Upload {
            stage,
            source,
            cleanup: report,
        },
        CreateProjectError::Timeout { after, .. } => CreateProjectError::Timeout {
            after,
            cleanup: report,
        },
        CreateProjectError::Scheduling { source, .. } => CreateProjectError::Scheduling {
            source,
            cleanup: report,
        },
        CreateProjectError::Persistence { source, .. } => CreateProjectError::Persistence {
            source,
            cleanup: report,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use folio_storage::{MemoryStorage, UploadPolicy};

    fn orchestrator(store: Arc<MemoryStorage>) -> UploadOrchestrator {
        let pool = Arc::new(UploadPool::new(PoolConfig {
            max_workers: 2,
            queue_capacity: 8,
        }));
        let uploader = Arc::new(AssetUploader::new(store, UploadPolicy::default()));
        UploadOrchestrator::new(pool, uploader, OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn uploads_into_correlation_folder() {
        let store = Arc::new(MemoryStorage::new());
        let orchestrator = orchestrator(store.clone());
        let id = Uuid::new_v4();
        let images = vec![
            Asset::new("a.png", vec![1u8; 4]),
            Asset::new("skip.png", Vec::<u8>::new()),
            Asset::new("b.jpg", vec![2u8; 4]),
        ];

        let uploaded = orchestrator
            .upload_assets(id, &Asset::new("t.png", vec![9u8; 4]), &images)
            .await
            .unwrap();

        assert_eq!(uploaded.folder, format!("uploads/{}", id));
        assert_eq!(uploaded.gallery.len(), 2);
        assert!(uploaded.gallery[1].as_str().ends_with(".jpg"));
        assert!(uploaded
            .gallery
            .iter()
            .chain(std::iter::once(&uploaded.thumbnail))
            .all(|k| k.as_str().starts_with(&uploaded.folder)));
        assert_eq!(uploaded.keys().len(), 3);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn empty_thumbnail_fails_and_cleans_gallery() {
        let store = Arc::new(MemoryStorage::new());
        let orchestrator = orchestrator(store.clone());
        let images = vec![Asset::new("a.png", vec![1u8; 4])];

        let err = orchestrator
            .upload_assets(
                Uuid::new_v4(),
                &Asset::new("t.png", Vec::<u8>::new()),
                &images,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CreateProjectError::Upload {
                stage: UploadStage::Thumbnail,
                ..
            }
        ));
        assert!(store.is_empty().await);
    }

    #[test]
    fn with_cleanup_keeps_the_cause() {
        let err = with_cleanup(
            CreateProjectError::Timeout {
                after: Duration::from_secs(1),
                cleanup: CleanupReport::default(),
            },
            CleanupReport {
                attempted: 2,
                deleted: 2,
                ..CleanupReport::default()
            },
        );
        match err {
            CreateProjectError::Timeout { after, cleanup } => {
                assert_eq!(after, Duration::from_secs(1));
                assert_eq!(cleanup.deleted, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
