//! # Background Document Sync
//!
//! Persisted, retryable, network- and lifecycle-aware pipeline that
//! converts locally stored scan records into documents and uploads them
//! to the user's cloud storage account.
//!
//! ## Components
//!
//! - **Task Store** (`store`): durable CRUD over the persisted task
//!   collection; one versioned JSON blob under a single settings key
//! - **Sync Worker** (`worker`): single-flight drain loop with bounded
//!   retry and increasing delays, gated on connectivity
//! - **Lifecycle Binder** (`lifecycle`): maps app foreground/background
//!   transitions to worker pause/resume
//! - **Destination Settings** (`settings`): resolution of the configured
//!   upload destination
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::{SyncWorker, SyncWorkerConfig, TaskStore, bind_lifecycle};
//! use std::sync::Arc;
//!
//! # async fn example(bridges: Bridges) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(TaskStore::new(bridges.settings.clone()));
//! let worker = SyncWorker::new(
//!     SyncWorkerConfig::default(),
//!     store,
//!     bridges.network,
//!     bridges.generator,
//!     bridges.cloud,
//!     bridges.notifier,
//!     bridges.destination,
//! );
//!
//! let _binding = bind_lifecycle(worker.clone(), bridges.lifecycle).await?;
//! worker.start().await;
//!
//! let task_id = worker.enqueue(new_task).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod lifecycle;
pub mod settings;
pub mod store;
pub mod task;
pub mod worker;

pub use error::{Result, SyncError};
pub use lifecycle::{bind_lifecycle, LifecycleBinding};
pub use settings::{DestinationSource, SettingsDestinationSource, SyncDestination};
pub use store::{TaskPatch, TaskStore};
pub use task::{NewSyncTask, QueueCounts, SyncTask, SyncTaskId, TaskStatus};
pub use worker::{SyncWorker, SyncWorkerConfig, WorkerStatus};
