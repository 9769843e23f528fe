//! # Sync Worker
//!
//! Drains the task store one task at a time, turning each queued scan
//! into a generated document and an uploaded artifact, with a bounded
//! retry policy and increasing delays.
//!
//! ## State machine
//!
//! ```text
//! Stopped --start()--> Running --pause()--> Paused
//!    ^                    ^                   |
//!    |                    +-----resume()------+
//!    +------stop() from Running or Paused-----+
//! ```
//!
//! `start` is idempotent while running. `pause` is cooperative: an
//! in-flight attempt finishes, only the next cycle is gated. `stop`
//! clears any scheduled retry timer but does not abort an in-flight
//! attempt; it simply will not be rescheduled.
//!
//! ## Scheduling
//!
//! Exactly one drain cycle runs at a time. Retry and pacing delays are
//! owned by the scheduled callback that re-invokes the cycle, never by
//! data on the task: a task marked pending is eligible the instant the
//! next cycle runs, and the timer is what decides when that is.

use bridge_traits::{
    CloudStorageClient, DocumentGenerator, NetworkMonitor, NotificationSeverity, RemoteFolder,
    UserNotifier,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SyncError};
use crate::settings::DestinationSource;
use crate::store::{TaskPatch, TaskStore};
use crate::task::{NewSyncTask, SyncTask, SyncTaskId, TaskStatus};

/// Maximum number of attempts per task
const MAX_RETRY_COUNT: u32 = 3;

/// Delay before the retry following the 1st/2nd/3rd failed attempt
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(120),
];

/// Cadence of connectivity re-checks while offline
const OFFLINE_RECHECK_DELAY: Duration = Duration::from_secs(30);

/// Pause between consecutive successful tasks
const PACING_DELAY: Duration = Duration::from_secs(1);

/// Worker tuning knobs. Production uses [`Default`]; tests shrink the
/// delays to keep scenarios fast.
#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    pub max_retry_count: u32,
    pub retry_delays: Vec<Duration>,
    pub offline_recheck_delay: Duration,
    pub pacing_delay: Duration,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            max_retry_count: MAX_RETRY_COUNT,
            retry_delays: RETRY_DELAYS.to_vec(),
            offline_recheck_delay: OFFLINE_RECHECK_DELAY,
            pacing_delay: PACING_DELAY,
        }
    }
}

/// Worker instance state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Stopped,
    Running,
    Paused,
}

/// Single-flight background sync worker.
///
/// One shared instance per process; inject the same `Arc` into the
/// lifecycle binder and any caller that needs to enqueue work or read
/// status.
pub struct SyncWorker {
    config: SyncWorkerConfig,
    store: Arc<TaskStore>,
    network: Arc<dyn NetworkMonitor>,
    generator: Arc<dyn DocumentGenerator>,
    cloud: Arc<dyn CloudStorageClient>,
    notifier: Arc<dyn UserNotifier>,
    destination: Arc<dyn DestinationSource>,
    state: Mutex<WorkerStatus>,
    /// Handle of the one scheduled re-invocation, if any
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Serializes drain cycles so at most one task is ever processing
    cycle: Mutex<()>,
}

impl SyncWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SyncWorkerConfig,
        store: Arc<TaskStore>,
        network: Arc<dyn NetworkMonitor>,
        generator: Arc<dyn DocumentGenerator>,
        cloud: Arc<dyn CloudStorageClient>,
        notifier: Arc<dyn UserNotifier>,
        destination: Arc<dyn DestinationSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            network,
            generator,
            cloud,
            notifier,
            destination,
            state: Mutex::new(WorkerStatus::Stopped),
            timer: Mutex::new(None),
            cycle: Mutex::new(()),
        })
    }

    /// Current instance state
    pub async fn status(&self) -> WorkerStatus {
        *self.state.lock().await
    }

    /// Shared task store, for callers that need queue contents or counts
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Persist a new pending task and, when running, trigger a drain.
    ///
    /// Storage write failures propagate; the caller surfaces them.
    pub async fn enqueue(self: &Arc<Self>, new: NewSyncTask) -> Result<SyncTaskId> {
        let id = self.store.add(new).await?;
        if self.status().await == WorkerStatus::Running {
            self.kick();
        }
        Ok(id)
    }

    /// Begin draining. Idempotent while already running; a paused
    /// worker is resumed with [`resume`](Self::resume), not `start`.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            match *state {
                WorkerStatus::Running => {
                    debug!("Worker start ignored, already running");
                    return;
                }
                WorkerStatus::Paused => {
                    debug!("Worker start ignored while paused");
                    return;
                }
                WorkerStatus::Stopped => *state = WorkerStatus::Running,
            }
        }
        info!("Sync worker started");
        self.kick();
    }

    /// Gate the next cycle. The in-flight attempt, if any, finishes.
    pub async fn pause(&self) {
        let mut state = self.state.lock().await;
        if *state == WorkerStatus::Running {
            *state = WorkerStatus::Paused;
            info!("Sync worker paused");
        }
    }

    /// Resume from paused and immediately attempt to drain again.
    pub async fn resume(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if *state != WorkerStatus::Paused {
                return;
            }
            *state = WorkerStatus::Running;
        }
        info!("Sync worker resumed");
        self.kick();
    }

    /// Stop draining and clear any scheduled retry timer. An attempt
    /// already in flight is not aborted; it just won't be rescheduled.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            if *state == WorkerStatus::Stopped {
                return;
            }
            *state = WorkerStatus::Stopped;
        }
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }
        info!("Sync worker stopped");
    }

    /// Run a drain cycle in the background
    fn kick(self: &Arc<Self>) {
        tokio::spawn(self.process_queue_boxed());
    }

    /// Type-erased cycle future for the spawned kick and timer tasks.
    /// `schedule` spawns a future that awaits the cycle, and the cycle
    /// awaits `schedule`; boxing breaks that recursive future type so
    /// the spawned tasks have a nameable `Send` bound.
    fn process_queue_boxed(self: &Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let worker = Arc::clone(self);
        Box::pin(async move { worker.process_queue().await })
    }

    /// Re-invoke the drain cycle after `delay`, replacing any timer
    /// already scheduled.
    async fn schedule(self: &Arc<Self>, delay: Duration) {
        let mut slot = self.timer.lock().await;
        let worker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The slot still holds this task's own handle at this point:
            // any later schedule() would have aborted us during the
            // sleep. Clear it before draining so the next schedule()
            // does not abort the running cycle.
            worker.timer.lock().await.take();
            worker.process_queue_boxed().await;
        });
        // Fill the slot while still holding the lock the spawned task's
        // take() contends on, so even a zero-delay timer cannot observe
        // an empty slot or a stale handle.
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    /// One drain cycle: check state and connectivity, take the oldest
    /// pending task, run it, persist the outcome, schedule the next
    /// cycle as the retry policy dictates.
    async fn process_queue(self: &Arc<Self>) {
        let _cycle = self.cycle.lock().await;

        // Suspension point controlled by the lifecycle binder
        if self.status().await != WorkerStatus::Running {
            debug!("Drain cycle skipped, worker not running");
            return;
        }

        if !self.network.is_connected().await {
            debug!(
                recheck_secs = self.config.offline_recheck_delay.as_secs(),
                "Offline, deferring sync"
            );
            self.schedule(self.config.offline_recheck_delay).await;
            return;
        }

        // Cycles are serialized, so any task still marked processing
        // here was stranded by an interrupted run or a failed outcome
        // write. Put it back in the pending pool before draining.
        match self.store.recover_processing().await {
            Ok(0) => {}
            Ok(reset) => warn!(count = reset, "Reset tasks stranded in processing"),
            Err(e) => {
                warn!(error = %e, "Failed to recover stranded tasks, rescheduling");
                self.schedule(self.config.offline_recheck_delay).await;
                return;
            }
        }

        let pending = match self.store.list_by_status(TaskStatus::Pending).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Failed to read task queue, rescheduling");
                self.schedule(self.config.offline_recheck_delay).await;
                return;
            }
        };

        // Oldest-first: storage order is insertion order
        let Some(task) = pending.into_iter().next() else {
            debug!("Sync queue drained, going idle");
            return;
        };

        if let Err(e) = self
            .store
            .update(
                task.id,
                TaskPatch {
                    status: Some(TaskStatus::Processing),
                    ..TaskPatch::default()
                },
            )
            .await
        {
            warn!(task_id = %task.id, error = %e, "Failed to mark task processing, rescheduling");
            self.schedule(self.config.offline_recheck_delay).await;
            return;
        }

        match self.run_task(&task).await {
            Ok(remote_id) => {
                info!(
                    task_id = %task.id,
                    scan_id = %task.scan_id,
                    service = %task.cloud_service,
                    remote_id = %remote_id,
                    "Sync task uploaded"
                );
                if let Err(e) = self.store.remove(task.id).await {
                    warn!(task_id = %task.id, error = %e, "Failed to remove completed task");
                }
                self.schedule(self.config.pacing_delay).await;
            }
            Err(err) => self.handle_failure(&task, err).await,
        }
    }

    /// Apply the bounded-retry policy to a failed attempt
    async fn handle_failure(self: &Arc<Self>, task: &SyncTask, err: SyncError) {
        let retry_count = task.retry_count + 1;
        // Deterministic failures skip the remaining retry budget
        let terminal = err.is_permanent() || retry_count >= self.config.max_retry_count;

        if !terminal {
            let outcome = self
                .store
                .update(
                    task.id,
                    TaskPatch {
                        status: Some(TaskStatus::Pending),
                        retry_count: Some(retry_count),
                        error: Some(err.to_string()),
                        ..TaskPatch::default()
                    },
                )
                .await;
            if let Err(e) = outcome {
                warn!(task_id = %task.id, error = %e, "Failed to persist retry state, rescheduling");
                self.schedule(self.config.offline_recheck_delay).await;
                return;
            }

            if retry_count == 1 {
                self.notifier
                    .notify(
                        "Sync in progress, some scans will be retried shortly",
                        NotificationSeverity::Info,
                    )
                    .await;
            }

            let delay = self.retry_delay(retry_count);
            warn!(
                task_id = %task.id,
                retry_count,
                max_retries = self.config.max_retry_count,
                delay_secs = delay.as_secs(),
                error = %err,
                "Sync attempt failed, will retry"
            );
            self.schedule(delay).await;
        } else {
            if let Err(e) = self
                .store
                .update(
                    task.id,
                    TaskPatch {
                        status: Some(TaskStatus::Failed),
                        retry_count: Some(retry_count),
                        error: Some(err.to_string()),
                        ..TaskPatch::default()
                    },
                )
                .await
            {
                warn!(task_id = %task.id, error = %e, "Failed to persist terminal failure");
            }

            self.notifier
                .notify(
                    &format!("Couldn't upload scan {}: {}", task.scan_id, err),
                    NotificationSeverity::Error,
                )
                .await;

            if let Err(e) = self.store.remove(task.id).await {
                warn!(task_id = %task.id, error = %e, "Failed to remove failed task");
            }

            error!(
                task_id = %task.id,
                scan_id = %task.scan_id,
                retry_count,
                error = %err,
                "Sync task failed permanently"
            );
            self.schedule(self.config.pacing_delay).await;
        }
    }

    /// Delay before the retry following failure number `retry_count`
    fn retry_delay(&self, retry_count: u32) -> Duration {
        let index = retry_count.saturating_sub(1) as usize;
        self.config
            .retry_delays
            .get(index)
            .or_else(|| self.config.retry_delays.last())
            .copied()
            .unwrap_or(OFFLINE_RECHECK_DELAY)
    }

    /// Execute one task attempt and report any failure to diagnostics
    /// before handing it back to the cycle.
    async fn run_task(&self, task: &SyncTask) -> Result<String> {
        let result = self.execute_task(task).await;
        if let Err(err) = &result {
            error!(
                task_id = %task.id,
                scan_id = %task.scan_id,
                service = %task.cloud_service,
                error = %err,
                "Sync task attempt failed"
            );
        }
        result
    }

    /// The task body: validate, resolve destination, generate, upload,
    /// clean up.
    async fn execute_task(&self, task: &SyncTask) -> Result<String> {
        // Deterministic validation, before touching the network
        task.validate_snapshot()?;

        let destination = self
            .destination
            .destination()
            .await?
            .ok_or(SyncError::NoDestination)?;

        // Task-level hints override the configured default folder
        let folder = RemoteFolder {
            id: task.folder.id.clone().or(destination.folder.id),
            path: task.folder.path.clone().or(destination.folder.path),
        };

        let local_path = self
            .generator
            .generate(&task.snapshot, task.format)
            .await
            .map_err(|e| SyncError::Generation(e.to_string()))?;

        // Record the path before uploading so an interrupted attempt
        // still knows which file to clean up
        self.store
            .update(
                task.id,
                TaskPatch {
                    file_path: Some(local_path.clone()),
                    ..TaskPatch::default()
                },
            )
            .await?;

        let remote_name = task.remote_file_name()?;
        let remote_id = self
            .cloud
            .upload(task.cloud_service, &local_path, &remote_name, &folder)
            .await
            .map_err(|e| SyncError::Upload(e.to_string()))?;

        // Best-effort cleanup of the generated document
        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            warn!(path = ?local_path, error = %e, "Failed to delete generated document");
        }

        Ok(remote_id)
    }
}
