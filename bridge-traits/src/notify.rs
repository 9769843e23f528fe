//! User Notification Abstraction
//!
//! Surfaces background-sync outcomes to the user. The sink is
//! fire-and-forget: it must never propagate a failure back into the
//! caller, which is why `notify` is infallible.

use async_trait::async_trait;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSeverity {
    /// Informational notice, e.g. a soft "retrying" hint
    Info,
    /// Warning the user may want to act on
    Warning,
    /// Terminal failure requiring attention
    Error,
}

/// User notification sink trait
///
/// # Platform Support
///
/// - **iOS/Android**: local notifications or in-app toasts
/// - **Desktop**: system notification center
#[async_trait]
pub trait UserNotifier: Send + Sync {
    /// Deliver a message to the user. Implementations swallow their own
    /// delivery errors.
    async fn notify(&self, message: &str, severity: NotificationSeverity);
}
