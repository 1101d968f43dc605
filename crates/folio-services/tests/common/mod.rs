#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use folio_core::models::{Asset, AssetKey, CreateProjectRequest, NewProject, Page, PageRequest, Project};
use folio_core::{AppError, StorageBackend};
use folio_db::{InMemoryProjectRepository, ProjectRepositoryTrait};
use folio_services::{
    OrchestratorConfig, PoolConfig, ProjectService, UploadOrchestrator, UploadPool,
};
use folio_storage::{AssetStore, AssetUploader, DeleteOutcome, StorageError, StorageResult, UploadPolicy};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    Delay(Duration),
    FailAfter(Duration),
    Hang,
}

/// How a delete of an object uploaded from a given filename behaves.
#[derive(Debug, Clone, Copy)]
pub enum DeleteBehaviour {
    Fail,
    Hang,
}

#[derive(Default)]
struct State {
    objects: HashSet<String>,
    puts: Vec<String>,
    deletes: Vec<String>,
}

/// Asset store double. Behaviour is chosen per filename; keys are
/// `{folder}/{filename}#{n}`.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
    behaviours: Mutex<HashMap<String, Behaviour>>,
    delete_behaviours: Mutex<HashMap<String, DeleteBehaviour>>,
    counter: AtomicUsize,
    gallery_inflight: AtomicUsize,
    max_gallery_inflight: AtomicUsize,
    inflight: AtomicUsize,
}

struct InflightCount<'a> {
    store: &'a FakeStore,
    gallery: bool,
}

impl Drop for InflightCount<'_> {
    fn drop(&mut self) {
        self.store.inflight.fetch_sub(1, Ordering::SeqCst);
        if self.gallery {
            self.store.gallery_inflight.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn behave(&self, filename: &str, behaviour: Behaviour) {
        self.behaviours
            .lock()
            .unwrap()
            .insert(filename.to_string(), behaviour);
    }

    pub fn behave_on_delete(&self, filename: &str, behaviour: DeleteBehaviour) {
        self.delete_behaviours
            .lock()
            .unwrap()
            .insert(filename.to_string(), behaviour);
    }

    pub fn puts(&self) -> Vec<String> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent puts of non-thumbnail assets.
    pub fn max_gallery_inflight(&self) -> usize {
        self.max_gallery_inflight.load(Ordering::SeqCst)
    }

    fn enter(&self, filename: &str) -> InflightCount<'_> {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        let gallery = !filename.starts_with("thumb");
        if gallery {
            let now = self.gallery_inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_gallery_inflight.fetch_max(now, Ordering::SeqCst);
        }
        InflightCount {
            store: self,
            gallery,
        }
    }
}

#[async_trait]
impl AssetStore for FakeStore {
    async fn put(&self, folder: &str, asset: &Asset) -> StorageResult<AssetKey> {
        let _count = self.enter(&asset.filename);
        let behaviour = self
            .behaviours
            .lock()
            .unwrap()
            .get(&asset.filename)
            .copied()
            .unwrap_or(Behaviour::Delay(Duration::ZERO));

        match behaviour {
            Behaviour::Delay(delay) => tokio::time::sleep(delay).await,
            Behaviour::FailAfter(delay) => {
                tokio::time::sleep(delay).await;
                return Err(StorageError::UploadFailed(format!(
                    "injected failure for {}",
                    asset.filename
                )));
            }
            Behaviour::Hang => std::future::pending::<()>().await,
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}/{}#{}", folder, asset.filename, n);
        let mut state = self.state.lock().unwrap();
        state.objects.insert(key.clone());
        state.puts.push(key.clone());
        Ok(AssetKey::new(key))
    }

    async fn delete(&self, key: &AssetKey) -> StorageResult<DeleteOutcome> {
        self.state.lock().unwrap().deletes.push(key.to_string());
        let behaviour = self
            .delete_behaviours
            .lock()
            .unwrap()
            .get(&filename_of(key))
            .copied();

        match behaviour {
            Some(DeleteBehaviour::Fail) => {
                return Err(StorageError::DeleteFailed(format!(
                    "injected delete failure for {}",
                    key
                )));
            }
            Some(DeleteBehaviour::Hang) => std::future::pending::<()>().await,
            None => {}
        }

        let mut state = self.state.lock().unwrap();
        if state.objects.remove(key.as_str()) {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    async fn exists(&self, key: &AssetKey) -> StorageResult<bool> {
        Ok(self.state.lock().unwrap().objects.contains(key.as_str()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Repository whose writes always fail.
#[derive(Default)]
pub struct FailingRepository;

#[async_trait]
impl ProjectRepositoryTrait for FailingRepository {
    async fn save(&self, _project: NewProject) -> Result<Project, AppError> {
        Err(AppError::Database("connection reset by peer".to_string()))
    }

    async fn search(
        &self,
        _term: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Project>, AppError> {
        Ok(Page::new(Vec::new(), page, 0))
    }

    async fn find_by_unique_id(&self, _unique_id: Uuid) -> Result<Option<Project>, AppError> {
        Ok(None)
    }

    async fn exists_by_unique_id(&self, _unique_id: Uuid) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn delete_by_unique_id(&self, _unique_id: Uuid) -> Result<bool, AppError> {
        Ok(false)
    }
}

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub pool: Arc<UploadPool>,
    pub uploader: Arc<AssetUploader>,
    pub service: ProjectService,
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        join_timeout: Duration::from_secs(5),
        settle_grace: Duration::from_millis(500),
        cleanup_timeout: Duration::from_secs(1),
    }
}

pub fn harness(workers: usize, config: OrchestratorConfig) -> (Harness, Arc<InMemoryProjectRepository>) {
    let repository = Arc::new(InMemoryProjectRepository::new());
    (
        harness_with_repository(workers, config, repository.clone()),
        repository,
    )
}

pub fn harness_with_repository(
    workers: usize,
    config: OrchestratorConfig,
    repository: Arc<dyn ProjectRepositoryTrait>,
) -> Harness {
    let store = FakeStore::new();
    let pool = Arc::new(UploadPool::new(PoolConfig {
        max_workers: workers,
        queue_capacity: 64,
    }));
    let uploader = Arc::new(AssetUploader::new(store.clone(), UploadPolicy::default()));
    let orchestrator = UploadOrchestrator::new(pool.clone(), uploader.clone(), config);
    Harness {
        store,
        pool,
        uploader,
        service: ProjectService::new(orchestrator, repository),
    }
}

pub fn asset(filename: &str, kb: usize) -> Asset {
    Asset::new(filename, vec![7u8; kb * 1024])
}

pub fn request(thumbnail: Asset, images: Vec<Asset>) -> CreateProjectRequest {
    CreateProjectRequest {
        title: "Garden wall".to_string(),
        description: Some("Dry stone, 12m".to_string()),
        service_type: "masonry".to_string(),
        thumbnail,
        images,
    }
}

/// Filename part of a fake store key.
pub fn filename_of(key: &AssetKey) -> String {
    let last = key.as_str().rsplit('/').next().unwrap_or_default();
    last.split('#').next().unwrap_or_default().to_string()
}

pub fn sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}
