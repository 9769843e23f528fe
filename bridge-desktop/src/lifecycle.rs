//! App Lifecycle Observation
//!
//! Desktop shells have no OS-imposed lifecycle, so the host application
//! (window manager integration, tray icon, etc.) reports transitions
//! explicitly through [`HostLifecycleObserver::set_state`].

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState},
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Lifecycle observer fed by the embedding shell
pub struct HostLifecycleObserver {
    current: Arc<Mutex<LifecycleState>>,
    sender: broadcast::Sender<LifecycleState>,
}

impl HostLifecycleObserver {
    /// Create an observer starting in the foreground state
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            current: Arc::new(Mutex::new(LifecycleState::Foreground)),
            sender,
        }
    }

    /// Report a lifecycle transition. Subscribers that lag far enough
    /// to miss intermediate states still observe the latest one.
    pub async fn set_state(&self, state: LifecycleState) {
        let mut current = self.current.lock().await;
        if *current != state {
            *current = state;
            debug!(state = ?state, "Host lifecycle transition");
            // Send fails only when no subscriber exists, which is fine
            let _ = self.sender.send(state);
        }
    }
}

impl Default for HostLifecycleObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleObserver for HostLifecycleObserver {
    async fn state(&self) -> Result<LifecycleState> {
        Ok(*self.current.lock().await)
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>> {
        Ok(Box::new(HostLifecycleChangeStream {
            receiver: self.sender.subscribe(),
        }))
    }
}

struct HostLifecycleChangeStream {
    receiver: broadcast::Receiver<LifecycleState>,
}

#[async_trait]
impl LifecycleChangeStream for HostLifecycleChangeStream {
    async fn next(&mut self) -> Option<LifecycleState> {
        loop {
            match self.receiver.recv().await {
                Ok(state) => return Some(state),
                // Skip over dropped intermediate states
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
