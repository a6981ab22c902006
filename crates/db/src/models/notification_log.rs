//! Append-only history of alerts produced by the monitor.

use flowwatch_core::alert_policy::AlertKind;
use flowwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notification_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationLog {
    pub id: DbId,
    pub user_id: DbId,
    pub workflow_id: Option<DbId>,
    pub instance_id: Option<DbId>,
    pub execution_id: Option<DbId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    /// At least one channel accepted the alert.
    pub sent: bool,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert payload for a log entry.
#[derive(Debug, Clone)]
pub struct NewNotificationLog {
    pub user_id: DbId,
    pub workflow_id: Option<DbId>,
    pub instance_id: Option<DbId>,
    pub execution_id: Option<DbId>,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub sent: bool,
}

/// Pagination for log listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LogPage {
    #[serde(default = "LogPage::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl LogPage {
    fn default_limit() -> i64 {
        50
    }
}

impl Default for LogPage {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
            offset: 0,
        }
    }
}
