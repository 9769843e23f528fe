//! Cloud Storage Abstraction
//!
//! Uploads a local file into a named location of the user's cloud
//! storage account. Providers differ in how destinations are addressed:
//! Drive-style APIs use opaque folder ids, Dropbox-style APIs use paths,
//! so both hints travel together.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Supported cloud storage providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudService {
    GoogleDrive,
    Dropbox,
    OneDrive,
}

impl std::fmt::Display for CloudService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GoogleDrive => "google_drive",
            Self::Dropbox => "dropbox",
            Self::OneDrive => "onedrive",
        };
        f.write_str(name)
    }
}

/// Destination folder hints, provider-specific.
///
/// `id` is used by id-addressed providers (Google Drive, OneDrive),
/// `path` by path-addressed ones (Dropbox). Either or both may be
/// absent, in which case the provider's default location is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Cloud storage client trait
///
/// Fails on authentication, quota, or transport errors; the caller
/// decides whether a failure is worth retrying.
#[async_trait]
pub trait CloudStorageClient: Send + Sync {
    /// Upload a local file under `remote_name` into `folder` on the
    /// given service. Returns the provider's identifier for the
    /// uploaded file.
    ///
    /// Uploading the same `remote_name` twice overwrites rather than
    /// duplicates, which keeps retried uploads idempotent.
    async fn upload(
        &self,
        service: CloudService,
        local_path: &Path,
        remote_name: &str,
        folder: &RemoteFolder,
    ) -> Result<String>;
}
