//! # Destination Settings
//!
//! Resolution of the user's currently configured upload destination.
//! The worker consults this at the start of every attempt so that a
//! destination change between retries takes effect immediately.

use async_trait::async_trait;
use bridge_traits::{CloudService, RemoteFolder, SettingsStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, SyncError};

/// Settings key holding the configured destination
const DESTINATION_KEY: &str = "sync.destination";

/// The user's configured upload destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDestination {
    pub service: CloudService,
    /// Default destination folder; task-level hints override this
    #[serde(default)]
    pub folder: RemoteFolder,
}

/// Source of the current destination settings
#[async_trait]
pub trait DestinationSource: Send + Sync {
    /// Current destination, or `None` when no cloud account is
    /// configured at all.
    async fn destination(&self) -> Result<Option<SyncDestination>>;
}

/// Destination source backed by a [`SettingsStore`] record
pub struct SettingsDestinationSource {
    settings: Arc<dyn SettingsStore>,
}

impl SettingsDestinationSource {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Persist a new destination, replacing any previous one
    pub async fn store_destination(&self, destination: &SyncDestination) -> Result<()> {
        let raw = serde_json::to_string(destination)
            .map_err(|e| SyncError::Storage(e.to_string()))?;
        self.settings
            .set_string(DESTINATION_KEY, &raw)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))
    }

    /// Remove the configured destination
    pub async fn clear_destination(&self) -> Result<()> {
        self.settings
            .delete(DESTINATION_KEY)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))
    }
}

#[async_trait]
impl DestinationSource for SettingsDestinationSource {
    async fn destination(&self) -> Result<Option<SyncDestination>> {
        let raw = self
            .settings
            .get_string(DESTINATION_KEY)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        match raw {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SyncError::Storage(format!("corrupt destination record: {}", e))),
        }
    }
}
