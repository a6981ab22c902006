//! Repository for the `push_subscriptions` table.

use flowwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::push_subscription::{PushSubscription, UpsertPushSubscription};

/// Column list for `push_subscriptions` queries.
const COLUMNS: &str = "\
    id, user_id, endpoint, p256dh, auth, is_active, created_at, updated_at";

pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE user_id = $1 AND is_active = true \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Register an endpoint, reactivating and re-keying it if it already exists.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertPushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (endpoint) DO UPDATE SET \
                user_id = EXCLUDED.user_id, \
                p256dh = EXCLUDED.p256dh, \
                auth = EXCLUDED.auth, \
                is_active = true, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .bind(&input.endpoint)
            .bind(&input.p256dh)
            .bind(&input.auth)
            .fetch_one(pool)
            .await
    }

    /// Permanently disable an endpoint the push service reported as gone.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE push_subscriptions SET is_active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove a user's endpoint. Returns `true` if a row was deleted.
    pub async fn remove_for_user(
        pool: &PgPool,
        user_id: DbId,
        endpoint: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND endpoint = $2")
                .bind(user_id)
                .bind(endpoint)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
