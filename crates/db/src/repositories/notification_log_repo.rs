//! Repository for the append-only `notification_logs` table.
//!
//! Rows are never updated or deleted.

use flowwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification_log::{LogPage, NewNotificationLog, NotificationLog};

/// Column list for `notification_logs` queries.
const COLUMNS: &str = "\
    id, user_id, workflow_id, instance_id, execution_id, kind, \
    title, message, metadata, sent, sent_at, created_at";

pub struct NotificationLogRepo;

impl NotificationLogRepo {
    /// Append a log entry. `sent_at` is set when `sent` is true.
    pub async fn append(
        pool: &PgPool,
        input: &NewNotificationLog,
    ) -> Result<NotificationLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_logs \
                (user_id, workflow_id, instance_id, execution_id, kind, \
                 title, message, metadata, sent, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
                     CASE WHEN $9 THEN NOW() ELSE NULL END) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(input.user_id)
            .bind(input.workflow_id)
            .bind(input.instance_id)
            .bind(input.execution_id)
            .bind(input.kind.as_str())
            .bind(&input.title)
            .bind(&input.message)
            .bind(&input.metadata)
            .bind(input.sent)
            .fetch_one(pool)
            .await
    }

    /// A user's log entries, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        page: LogPage,
    ) -> Result<Vec<NotificationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_logs \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(pool)
            .await
    }
}
