//! # Task Store
//!
//! Durable persistence for the sync task collection. Pure CRUD and
//! status queries; retry policy and network awareness live in the
//! worker.
//!
//! ## Persistence layout
//!
//! The whole collection is one serialized JSON document under a single
//! [`SettingsStore`] key, wrapped in a versioned envelope so future
//! field changes can be migrated instead of silently producing
//! malformed records:
//!
//! ```json
//! {"version":1,"tasks":[ ... ]}
//! ```
//!
//! ## Concurrency contract
//!
//! Every operation is a read-modify-write over that one blob, serialized
//! behind an async mutex. The worker and UI callers may therefore call
//! into the store from any task without interleaving partial writes;
//! ordering between writers is the mutex acquisition order.

use bridge_traits::SettingsStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::task::{NewSyncTask, QueueCounts, SyncTask, SyncTaskId, TaskStatus};

/// Settings key holding the serialized queue
const TASK_QUEUE_KEY: &str = "sync.task_queue";

/// Current persisted-blob schema version
const TASK_QUEUE_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope around the persisted task array
#[derive(Debug, Serialize, Deserialize)]
struct PersistedQueue {
    version: u32,
    tasks: Vec<SyncTask>,
}

/// Partial update applied by [`TaskStore::update`]; `None` fields are
/// left untouched. `updated_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub retry_count: Option<u32>,
    pub error: Option<String>,
    pub file_path: Option<PathBuf>,
}

/// Persisted collection of sync tasks
pub struct TaskStore {
    settings: Arc<dyn SettingsStore>,
    lock: Mutex<()>,
}

impl TaskStore {
    /// Create a store over the given settings backend
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            settings,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<SyncTask>> {
        let raw = self
            .settings
            .get_string(TASK_QUEUE_KEY)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        let queue: PersistedQueue = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Storage(format!("corrupt task queue blob: {}", e)))?;

        if queue.version != TASK_QUEUE_SCHEMA_VERSION {
            return Err(SyncError::Storage(format!(
                "unsupported task queue schema version {}",
                queue.version
            )));
        }

        Ok(queue.tasks)
    }

    async fn save(&self, tasks: Vec<SyncTask>) -> Result<()> {
        let blob = serde_json::to_string(&PersistedQueue {
            version: TASK_QUEUE_SCHEMA_VERSION,
            tasks,
        })
        .map_err(|e| SyncError::Storage(e.to_string()))?;

        self.settings
            .set_string(TASK_QUEUE_KEY, &blob)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))
    }

    /// All tasks in storage order. Storage order is insertion order,
    /// which is the FIFO order the worker drains in.
    pub async fn list_all(&self) -> Result<Vec<SyncTask>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Tasks with the given status, preserving storage order
    pub async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<SyncTask>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|t| t.status == status)
            .collect())
    }

    /// Persist a new pending task and return its assigned id.
    ///
    /// A storage write failure propagates to the caller, who is
    /// responsible for surfacing it to the user.
    pub async fn add(&self, new: NewSyncTask) -> Result<SyncTaskId> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;

        let task = SyncTask::new(new);
        let id = task.id;
        info!(
            task_id = %id,
            scan_id = %task.scan_id,
            service = %task.cloud_service,
            format = %task.format,
            "Enqueued sync task"
        );

        tasks.push(task);
        self.save(tasks).await?;
        Ok(id)
    }

    /// Merge `patch` into the task with `id` and refresh `updated_at`.
    ///
    /// Fails with [`SyncError::TaskNotFound`] if the id is absent. A
    /// write failure is fatal to the caller's current operation and is
    /// never swallowed.
    pub async fn update(&self, id: SyncTaskId, patch: TaskPatch) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;

        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| SyncError::TaskNotFound {
                task_id: id.to_string(),
            })?;

        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(retry_count) = patch.retry_count {
            task.retry_count = retry_count;
        }
        if let Some(error) = patch.error {
            task.error = Some(error);
        }
        if let Some(file_path) = patch.file_path {
            task.file_path = Some(file_path);
        }
        task.updated_at = Utc::now().timestamp();

        debug!(task_id = %id, status = ?task.status, retry_count = task.retry_count, "Updated sync task");
        self.save(tasks).await
    }

    /// Delete the task with `id`; removing a missing id is a no-op.
    pub async fn remove(&self, id: SyncTaskId) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;

        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            debug!(task_id = %id, "Remove of absent task ignored");
            return Ok(());
        }

        debug!(task_id = %id, "Removed sync task");
        self.save(tasks).await
    }

    /// Reset every task stuck in `processing` back to `pending` and
    /// return how many were reset.
    ///
    /// A task is only legitimately `processing` while an attempt is in
    /// flight; one found at rest was stranded by a crash or a failed
    /// outcome write and would otherwise never be drained again. Retry
    /// counts are preserved.
    pub async fn recover_processing(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;

        let mut reset = 0;
        for task in tasks.iter_mut() {
            if task.status == TaskStatus::Processing {
                task.status = TaskStatus::Pending;
                task.updated_at = Utc::now().timestamp();
                reset += 1;
            }
        }
        if reset == 0 {
            return Ok(0);
        }

        info!(count = reset, "Recovered stranded processing tasks");
        self.save(tasks).await?;
        Ok(reset)
    }

    /// Aggregate counts for UI display
    pub async fn counts(&self) -> Result<QueueCounts> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;

        let mut counts = QueueCounts {
            total: tasks.len(),
            ..QueueCounts::default()
        };
        for task in &tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}
