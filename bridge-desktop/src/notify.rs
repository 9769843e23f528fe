//! User Notification Sink
//!
//! Desktop builds without a notification center integration route user
//! messages through the log at the matching level.

use async_trait::async_trait;
use bridge_traits::notify::{NotificationSeverity, UserNotifier};
use tracing::{error, info, warn};

/// Notifier that surfaces messages via `tracing`
pub struct LogNotifier;

#[async_trait]
impl UserNotifier for LogNotifier {
    async fn notify(&self, message: &str, severity: NotificationSeverity) {
        match severity {
            NotificationSeverity::Info => info!(target: "user_notice", "{}", message),
            NotificationSeverity::Warning => warn!(target: "user_notice", "{}", message),
            NotificationSeverity::Error => error!(target: "user_notice", "{}", message),
        }
    }
}
