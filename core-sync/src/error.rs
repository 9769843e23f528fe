use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync task {task_id} not found")]
    TaskNotFound { task_id: String },

    #[error("Invalid task ID: {0}")]
    InvalidTaskId(String),

    #[error("Invalid task status: {0}")]
    InvalidStatus(String),

    #[error("Invalid scan snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("No cloud destination configured")]
    NoDestination,

    #[error("Document generation failed: {0}")]
    Generation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lifecycle subscription failed: {0}")]
    Lifecycle(String),
}

impl SyncError {
    /// Whether retrying the same attempt can ever succeed.
    ///
    /// Invalid snapshots and missing destination configuration are
    /// deterministic: repeating the attempt reproduces the same failure,
    /// so the worker fails these fast instead of burning the retry budget.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidSnapshot(_) | Self::NoDestination)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
