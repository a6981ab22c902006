//! Repository for the `user_settings` table.

use flowwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_settings::{UpdateUserSettings, UserSettings};

/// Column list for `user_settings` queries.
const COLUMNS: &str = "\
    id, user_id, notify_on_error, error_threshold, notify_on_success, \
    notify_on_warning, auto_deactivate_workflow, auto_deactivate_threshold, \
    push_notifications_enabled, email_notifications_enabled, notification_email, \
    created_at, updated_at";

pub struct UserSettingsRepo;

impl UserSettingsRepo {
    /// Stored settings, or `None` when the user never saved any.
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserSettings>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_settings WHERE user_id = $1");
        sqlx::query_as::<_, UserSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or update settings.
    ///
    /// Uses `COALESCE` so only fields that are `Some` in the input overwrite
    /// the stored value; new rows fall back to the column defaults.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdateUserSettings,
    ) -> Result<UserSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_settings \
                (user_id, notify_on_error, error_threshold, notify_on_success, \
                 notify_on_warning, auto_deactivate_workflow, auto_deactivate_threshold, \
                 push_notifications_enabled, email_notifications_enabled, notification_email) \
             VALUES ($1, COALESCE($2, true), COALESCE($3, 1), COALESCE($4, false), \
                     COALESCE($5, true), COALESCE($6, false), COALESCE($7, 3), \
                     COALESCE($8, false), COALESCE($9, true), NULLIF($10, '')) \
             ON CONFLICT (user_id) DO UPDATE SET \
                notify_on_error = COALESCE($2, user_settings.notify_on_error), \
                error_threshold = COALESCE($3, user_settings.error_threshold), \
                notify_on_success = COALESCE($4, user_settings.notify_on_success), \
                notify_on_warning = COALESCE($5, user_settings.notify_on_warning), \
                auto_deactivate_workflow = COALESCE($6, user_settings.auto_deactivate_workflow), \
                auto_deactivate_threshold = COALESCE($7, user_settings.auto_deactivate_threshold), \
                push_notifications_enabled = COALESCE($8, user_settings.push_notifications_enabled), \
                email_notifications_enabled = COALESCE($9, user_settings.email_notifications_enabled), \
                notification_email = NULLIF(COALESCE($10, user_settings.notification_email), ''), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSettings>(&query)
            .bind(user_id)
            .bind(input.notify_on_error)
            .bind(input.error_threshold)
            .bind(input.notify_on_success)
            .bind(input.notify_on_warning)
            .bind(input.auto_deactivate_workflow)
            .bind(input.auto_deactivate_threshold)
            .bind(input.push_notifications_enabled)
            .bind(input.email_notifications_enabled)
            .bind(&input.notification_email)
            .fetch_one(pool)
            .await
    }
}
