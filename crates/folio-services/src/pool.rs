//! Process-wide bounded upload pool.
//!
//! A fixed number of workers pull jobs from a bounded queue. `submit` waits for a free
//! queue slot, so a full queue pushes back on callers instead of rejecting them. One pool
//! is shared by every concurrent creation and bounds the number of store connections.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use folio_storage::StorageError;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::task::UploadOutcome;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_workers: usize,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: 100,
        }
    }
}

impl PoolConfig {
    pub fn from_config(config: &folio_core::Config) -> Self {
        Self {
            max_workers: config.uploads().pool_max_workers,
            queue_capacity: config.uploads().pool_queue_capacity,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Upload pool is shut down")]
    Closed,

    #[error("Upload {seq} was dropped before reporting an outcome")]
    Abandoned { seq: u64 },
}

/// Point-in-time view of the pool for instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub workers: usize,
    pub active: usize,
    pub queued: usize,
    pub completed: u64,
}

/// Cancellation handles of one submitted job.
#[derive(Debug, Clone, Default)]
pub struct TaskControl {
    cancel: CancellationToken,
    abort: CancellationToken,
    started: Arc<AtomicBool>,
}

impl TaskControl {
    /// Keep the job from starting if it is still queued.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the job and stop it if it is already running.
    pub fn abort(&self) {
        self.cancel.cancel();
        self.abort.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether a worker has picked the job up. A job cancelled before this turns true
    /// will never run.
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }
}

/// Handle to the future outcome of a submitted job.
pub struct UploadHandle {
    seq: u64,
    control: TaskControl,
    outcome: oneshot::Receiver<UploadOutcome>,
    finished: bool,
}

impl UploadHandle {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn control(&self) -> TaskControl {
        self.control.clone()
    }

    /// True once `wait` has returned the outcome.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the job. A job dropped by the pool reports `Cancelled`, and so does
    /// every call after the outcome was taken.
    ///
    /// Cancel safe: dropping the returned future leaves the handle waitable.
    pub async fn wait(&mut self) -> UploadOutcome {
        if self.finished {
            return UploadOutcome::Cancelled;
        }
        let outcome = (&mut self.outcome)
            .await
            .unwrap_or(UploadOutcome::Cancelled);
        self.finished = true;
        outcome
    }

    pub async fn outcome(mut self) -> UploadOutcome {
        self.wait().await
    }
}

struct QueuedJob {
    seq: u64,
    job: BoxFuture<'static, UploadOutcome>,
    control: TaskControl,
    reply: oneshot::Sender<UploadOutcome>,
}

#[derive(Default)]
struct PoolStats {
    active: AtomicUsize,
    completed: AtomicU64,
}

pub struct UploadPool {
    sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<PoolStats>,
    worker_count: usize,
}

impl UploadPool {
    /// Start the workers. Must be called inside a Tokio runtime.
    pub fn new(config: PoolConfig) -> Self {
        let worker_count = config.max_workers.max(1);
        let queue_capacity = config.queue_capacity.max(1);

        let (sender, receiver) = mpsc::channel::<QueuedJob>(queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let stats = Arc::new(PoolStats::default());

        let workers = (0..worker_count)
            .map(|id| {
                let receiver = receiver.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    Self::worker_loop(id, receiver, stats).await;
                })
            })
            .collect();

        tracing::info!(
            max_workers = worker_count,
            queue_capacity,
            "Upload pool started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            stats,
            worker_count,
        }
    }

    /// Queue a job, waiting for a free slot when the queue is full.
    pub async fn submit<F>(&self, seq: u64, job: F) -> Result<UploadHandle, PoolError>
    where
        F: Future<Output = UploadOutcome> + Send + 'static,
    {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(PoolError::Closed)?;

        let control = TaskControl::default();
        let (reply, outcome) = oneshot::channel();

        sender
            .send(QueuedJob {
                seq,
                job: job.boxed(),
                control: control.clone(),
                reply,
            })
            .await
            .map_err(|_| PoolError::Closed)?;

        Ok(UploadHandle {
            seq,
            control,
            outcome,
            finished: false,
        })
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let queued = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.max_capacity() - s.capacity())
            .unwrap_or(0);

        PoolSnapshot {
            workers: self.worker_count,
            active: self.stats.active.load(Ordering::SeqCst),
            queued,
            completed: self.stats.completed.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting jobs, let the workers drain the queue, and wait for them.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Upload worker ended abnormally");
            }
        }
        tracing::info!("Upload pool stopped");
    }

    async fn worker_loop(
        id: usize,
        receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
        stats: Arc<PoolStats>,
    ) {
        loop {
            let next = {
                let mut receiver = receiver.lock().await;
                receiver.recv().await
            };
            let Some(queued) = next else {
                break;
            };
            Self::run_job(queued, &stats).await;
        }
        tracing::debug!(worker = id, "Upload worker stopped");
    }

    async fn run_job(queued: QueuedJob, stats: &PoolStats) {
        let QueuedJob {
            seq,
            job,
            control,
            reply,
        } = queued;

        // Mark before checking so a canceller that sees `has_started() == false`
        // knows this job will be skipped.
        control.mark_started();
        if control.is_cancelled() {
            tracing::debug!(seq, "Skipping cancelled upload");
            let _ = reply.send(UploadOutcome::Cancelled);
            return;
        }

        stats.active.fetch_add(1, Ordering::SeqCst);

        let outcome = tokio::select! {
            biased;
            result = AssertUnwindSafe(job).catch_unwind() => match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::error!(seq, "Upload job panicked");
                    UploadOutcome::Failure(StorageError::BackendError(
                        "upload job panicked".to_string(),
                    ))
                }
            },
            _ = control.abort.cancelled() => {
                tracing::debug!(seq, "Upload aborted while in flight");
                UploadOutcome::Cancelled
            }
        };

        stats.active.fetch_sub(1, Ordering::SeqCst);
        stats.completed.fetch_add(1, Ordering::SeqCst);

        // The submitter may have stopped waiting.
        let _ = reply.send(outcome);
    }
}
