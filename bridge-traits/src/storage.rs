//! Key-Value Settings Storage
//!
//! Abstracts platform-specific preferences/settings storage:
//! - iOS: UserDefaults
//! - Android: SharedPreferences / DataStore
//! - Desktop: config files or OS-specific preferences
//!
//! The core persists its sync queue and destination settings as string
//! values under well-known keys, so only the string operations are part
//! of the contract.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("sync.enabled", "true").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting; deleting a missing key is a no-op
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn keys(&self) -> Result<Vec<String>>;
}
