//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and platform-specific
//! implementations. Each trait represents a capability the core requires but
//! that must be implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Collaborators of the sync worker
//! - [`DocumentGenerator`](document::DocumentGenerator) - Render a scan snapshot into a local file
//! - [`CloudStorageClient`](cloud::CloudStorageClient) - Upload a local file to the user's cloud account
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity probe for deferring uploads while offline
//! - [`UserNotifier`](notify::UserNotifier) - Surface terminal sync outcomes to the user
//!
//! ### Platform integration
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - App foreground/background transitions
//! - [`SettingsStore`](storage::SettingsStore) - Key-value persistence for queue state and settings
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared freely across async tasks.

pub mod cloud;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod notify;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use cloud::{CloudService, CloudStorageClient, RemoteFolder};
pub use document::{DocumentFormat, DocumentGenerator, ScanSnapshot};
pub use lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus};
pub use notify::{NotificationSeverity, UserNotifier};
pub use storage::SettingsStore;
