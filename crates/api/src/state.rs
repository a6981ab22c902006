use std::sync::Arc;

use flowwatch_core::credentials::CredentialCipher;
use flowwatch_events::NotificationDispatcher;
use flowwatch_monitor::{MonitorService, MonitorStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc` or already shares
/// its internals.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for everything the API reads and writes directly.
    pub store: Arc<dyn MonitorStore>,
    /// Reconciliation, alerting and remote operations.
    pub monitor: MonitorService,
    /// Seals instance API keys before they are stored.
    pub cipher: CredentialCipher,
    /// Direct channel access for test notifications.
    pub dispatcher: NotificationDispatcher,
    pub config: Arc<ServerConfig>,
}
