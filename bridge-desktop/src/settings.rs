//! Settings Storage backed by a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// JSON-file-backed settings store implementation
///
/// All settings live in a single JSON object on disk. Writes replace
/// the file through a temp-file rename so a crash mid-write never
/// leaves a truncated document behind.
pub struct JsonFileSettingsStore {
    path: Option<PathBuf>,
    state: Mutex<Map<String, Value>>,
}

impl JsonFileSettingsStore {
    /// Open (or create) a settings store at the given path
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str::<Value>(&contents)
                .ok()
                .and_then(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .ok_or_else(|| {
                    BridgeError::OperationFailed(format!(
                        "Settings file is not a JSON object: {}",
                        path.display()
                    ))
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = %path.display(), entries = state.len(), "Opened settings store");

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// Open a store at the platform default location
    /// (e.g. `~/.config/scansync/settings.json` on Linux)
    pub async fn open_default() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            BridgeError::NotAvailable("No config directory on this platform".to_string())
        })?;
        Self::new(base.join("scansync").join("settings.json")).await
    }

    /// Create an in-memory settings store (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(Map::new()),
        }
    }

    async fn persist(&self, state: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(&Value::Object(state.clone()))
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to serialize: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(BridgeError::Io)?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(BridgeError::Io)?;

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(&state).await?;
        debug!(key = key, "Stored setting");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.lock().await;
        match state.get(key) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(BridgeError::OperationFailed(format!(
                "Setting {} is not a string: {}",
                key, other
            ))),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.remove(key).is_some() {
            self.persist(&state).await?;
            debug!(key = key, "Deleted setting");
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state.keys().cloned().collect())
    }
}
