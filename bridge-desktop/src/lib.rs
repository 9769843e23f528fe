//! # Desktop Bridge Implementations
//!
//! Concrete desktop (Windows/macOS/Linux) implementations of the
//! platform capability traits from `bridge-traits`:
//!
//! - [`JsonFileSettingsStore`]: settings persisted to a JSON file
//! - [`DesktopNetworkMonitor`]: TCP reachability probing
//! - [`HostLifecycleObserver`]: shell-reported lifecycle transitions
//! - [`LogNotifier`]: user notices routed through the log

pub mod lifecycle;
pub mod network;
pub mod notify;
pub mod settings;

pub use lifecycle::HostLifecycleObserver;
pub use network::DesktopNetworkMonitor;
pub use notify::LogNotifier;
pub use settings::JsonFileSettingsStore;
