//! Repository for the `instances` table.

use flowwatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::instance::{CreateInstance, Instance};

/// Column list for `instances` queries.
const COLUMNS: &str = "\
    id, user_id, name, base_url, api_key_sealed, is_active, \
    last_check_at, created_at, updated_at";

/// Provides query operations for registered instances.
pub struct InstanceRepo;

impl InstanceRepo {
    // ── Queries ──────────────────────────────────────────────────────

    /// All instances flagged active, across users, ordered by ID.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Instance>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM instances WHERE is_active = true ORDER BY id ASC");
        sqlx::query_as::<_, Instance>(&query).fetch_all(pool).await
    }

    /// Instances owned by a user, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Instance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM instances WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Instance>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Instance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM instances WHERE id = $1");
        sqlx::query_as::<_, Instance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an instance only if it belongs to `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Instance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM instances WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Instance>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn create(pool: &PgPool, input: &CreateInstance) -> Result<Instance, sqlx::Error> {
        let query = format!(
            "INSERT INTO instances (user_id, name, base_url, api_key_sealed) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Instance>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.base_url)
            .bind(&input.api_key_sealed)
            .fetch_one(pool)
            .await
    }

    /// Delete an instance owned by `user_id`. Workflows and executions
    /// cascade. Returns `true` if a row was deleted.
    pub async fn delete_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM instances WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamp the last successful contact with the remote instance.
    pub async fn touch_last_check(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE instances SET last_check_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }
}
