//! Per-user notification settings.

use flowwatch_core::alert_policy::AlertPolicy;
use flowwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `user_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserSettings {
    pub id: DbId,
    pub user_id: DbId,
    pub notify_on_error: bool,
    pub error_threshold: i32,
    pub notify_on_success: bool,
    pub notify_on_warning: bool,
    pub auto_deactivate_workflow: bool,
    pub auto_deactivate_threshold: i32,
    pub push_notifications_enabled: bool,
    pub email_notifications_enabled: bool,
    pub notification_email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserSettings {
    /// Alerting policy carried by this row.
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            notify_on_error: self.notify_on_error,
            error_threshold: self.error_threshold,
            notify_on_success: self.notify_on_success,
            notify_on_warning: self.notify_on_warning,
            auto_deactivate_workflow: self.auto_deactivate_workflow,
            auto_deactivate_threshold: self.auto_deactivate_threshold,
            push_notifications_enabled: self.push_notifications_enabled,
            email_notifications_enabled: self.email_notifications_enabled,
        }
    }
}

/// Partial update for user settings. `None` keeps the stored value.
///
/// An empty `notification_email` clears the address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserSettings {
    pub notify_on_error: Option<bool>,
    pub error_threshold: Option<i32>,
    pub notify_on_success: Option<bool>,
    pub notify_on_warning: Option<bool>,
    pub auto_deactivate_workflow: Option<bool>,
    pub auto_deactivate_threshold: Option<i32>,
    pub push_notifications_enabled: Option<bool>,
    pub email_notifications_enabled: Option<bool>,
    pub notification_email: Option<String>,
}
