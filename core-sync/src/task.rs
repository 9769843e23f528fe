//! # Sync Task Model
//!
//! The unit of work for the background sync queue: one scan record,
//! frozen at enqueue time, destined for one cloud service in one
//! document format.

use bridge_traits::{CloudService, DocumentFormat, RemoteFolder, ScanSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Type-safe sync task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTaskId(Uuid);

impl SyncTaskId {
    /// Create a new random task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a task ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::InvalidTaskId(e.to_string()))
    }
}

impl Default for SyncTaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sync task status
///
/// There is no persisted `completed` state: tasks leave the store on
/// terminal success, and on terminal failure once the user has been
/// notified. `Failed` therefore only exists between the last attempt
/// and the removal that follows the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is queued and waiting to be processed
    Pending,
    /// Task is currently being processed (at most one at a time)
    Processing,
    /// Task exhausted its attempts and awaits removal
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

/// Caller-supplied fields for a new task; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewSyncTask {
    /// Foreign reference to the source scan record
    pub scan_id: String,
    /// Frozen copy of the scan's content at enqueue time
    pub snapshot: ScanSnapshot,
    /// Destination provider
    pub cloud_service: CloudService,
    /// Target document type
    pub format: DocumentFormat,
    /// Destination-folder hints; empty hints fall back to the
    /// configured default destination
    pub folder: RemoteFolder,
}

/// A persisted sync task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTask {
    /// Unique identifier, assigned at creation, immutable
    pub id: SyncTaskId,
    /// Source scan record reference
    pub scan_id: String,
    /// Frozen scan content owned by this task
    pub snapshot: ScanSnapshot,
    /// Destination provider
    pub cloud_service: CloudService,
    /// Target document type
    pub format: DocumentFormat,
    /// Destination-folder hints
    #[serde(default)]
    pub folder: RemoteFolder,
    /// Current status
    pub status: TaskStatus,
    /// Number of failed attempts so far
    pub retry_count: u32,
    /// Last failure message, present after at least one failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Path of the last generated document, kept for cleanup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Unix timestamp when created
    pub created_at: i64,
    /// Unix timestamp when last updated
    pub updated_at: i64,
}

impl SyncTask {
    /// Create a pending task from caller-supplied fields
    pub fn new(new: NewSyncTask) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: SyncTaskId::new(),
            scan_id: new.scan_id,
            snapshot: new.snapshot,
            cloud_service: new.cloud_service,
            format: new.format,
            folder: new.folder,
            status: TaskStatus::Pending,
            retry_count: 0,
            error: None,
            file_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the snapshot's minimum required shape and return the
    /// parsed capture time.
    ///
    /// This is deterministic: a snapshot that fails here will fail on
    /// every attempt, so callers treat it as a permanent failure.
    pub fn validate_snapshot(&self) -> Result<DateTime<Utc>> {
        if self.snapshot.text.trim().is_empty() {
            return Err(SyncError::InvalidSnapshot(
                "scan text is empty".to_string(),
            ));
        }
        let captured = DateTime::parse_from_rfc3339(&self.snapshot.captured_at)
            .map_err(|e| {
                SyncError::InvalidSnapshot(format!(
                    "unparseable capture date {:?}: {}",
                    self.snapshot.captured_at, e
                ))
            })?;
        Ok(captured.with_timezone(&Utc))
    }

    /// Deterministic remote file name, stable across retries so a
    /// repeated upload overwrites rather than duplicates.
    pub fn remote_file_name(&self) -> Result<String> {
        let captured = self.validate_snapshot()?;
        Ok(format!(
            "{}_scan_{}.{}",
            captured.format("%Y-%m-%d"),
            self.scan_id,
            self.format.extension()
        ))
    }
}

/// Aggregate queue counts for UI display.
///
/// `completed` is always 0 in steady state under the remove-on-success
/// policy but stays in the interface for forward compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}
