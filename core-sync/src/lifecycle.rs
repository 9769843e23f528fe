//! # Lifecycle Binder
//!
//! Translates host application foreground/background transitions into
//! worker `pause()`/`resume()` calls. The binder holds no state beyond
//! the subscription task; it performs no retry or storage logic.

use bridge_traits::{LifecycleObserver, LifecycleState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::worker::SyncWorker;

/// Scoped handle on a lifecycle subscription.
///
/// Dropping the binding (or calling [`unbind`](Self::unbind)) releases
/// the subscription task; the worker keeps whatever state it last had.
pub struct LifecycleBinding {
    handle: JoinHandle<()>,
}

impl LifecycleBinding {
    /// Release the subscription explicitly
    pub fn unbind(self) {
        self.handle.abort();
    }
}

impl Drop for LifecycleBinding {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Subscribe the worker to lifecycle transitions: foreground resumes
/// draining, background and suspension pause it.
///
/// Called once at application start when auto-sync is enabled.
pub async fn bind_lifecycle(
    worker: Arc<SyncWorker>,
    observer: Arc<dyn LifecycleObserver>,
) -> Result<LifecycleBinding> {
    let mut stream = observer
        .subscribe_changes()
        .await
        .map_err(|e| SyncError::Lifecycle(e.to_string()))?;

    let handle = tokio::spawn(async move {
        while let Some(state) = stream.next().await {
            debug!(state = ?state, "Lifecycle transition");
            match state {
                LifecycleState::Foreground => worker.resume().await,
                LifecycleState::Background | LifecycleState::Suspended => worker.pause().await,
            }
        }
        debug!("Lifecycle stream closed");
    });

    Ok(LifecycleBinding { handle })
}
