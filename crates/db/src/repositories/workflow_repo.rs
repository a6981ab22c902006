//! Repository for the `workflows` table.

use std::collections::HashMap;

use flowwatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::workflow::{UpsertWorkflow, Workflow, WorkflowFilter, WorkflowSummary};

/// Column list for `workflows` queries.
const COLUMNS: &str = "\
    id, instance_id, remote_id, name, is_active, \
    last_sync_at, last_execution_at, created_at, updated_at";

/// Same columns qualified with the `w` alias for joins.
const QUALIFIED_COLUMNS: &str = "\
    w.id, w.instance_id, w.remote_id, w.name, w.is_active, \
    w.last_sync_at, w.last_execution_at, w.created_at, w.updated_at";

/// Provides query operations for mirrored workflows.
pub struct WorkflowRepo;

impl WorkflowRepo {
    // ── Queries ──────────────────────────────────────────────────────

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflows WHERE id = $1");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a workflow only if its instance belongs to `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM workflows w \
             JOIN instances i ON i.id = w.instance_id \
             WHERE w.id = $1 AND i.user_id = $2"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Map of remote workflow ID to local ID for one instance.
    pub async fn remote_id_map(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<HashMap<String, DbId>, sqlx::Error> {
        let rows: Vec<(String, DbId)> =
            sqlx::query_as("SELECT remote_id, id FROM workflows WHERE instance_id = $1")
                .bind(instance_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// List a user's workflows with the status of their latest execution.
    ///
    /// Ordered by most recently synced first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &WorkflowFilter,
    ) -> Result<Vec<WorkflowSummary>, sqlx::Error> {
        let recent_errors = if filter.has_recent_errors == Some(true) {
            "AND last_exec.status = 'error'"
        } else {
            ""
        };
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS}, i.name AS instance_name, \
                    last_exec.status AS last_execution_status \
             FROM workflows w \
             JOIN instances i ON i.id = w.instance_id \
             LEFT JOIN LATERAL ( \
                SELECT e.status FROM executions e \
                WHERE e.workflow_id = w.id \
                ORDER BY e.started_at DESC NULLS LAST, e.id DESC \
                LIMIT 1 \
             ) last_exec ON true \
             WHERE i.user_id = $1 \
               AND ($2::BIGINT IS NULL OR w.instance_id = $2) \
               AND ($3::BOOLEAN IS NULL OR w.is_active = $3) \
               {recent_errors} \
             ORDER BY w.last_sync_at DESC NULLS LAST, w.id ASC"
        );
        sqlx::query_as::<_, WorkflowSummary>(&query)
            .bind(user_id)
            .bind(filter.instance_id)
            .bind(filter.active)
            .fetch_all(pool)
            .await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert or update on `(instance_id, remote_id)`.
    pub async fn upsert(pool: &PgPool, input: &UpsertWorkflow) -> Result<Workflow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflows (instance_id, remote_id, name, is_active, last_sync_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (instance_id, remote_id) DO UPDATE SET \
                name = EXCLUDED.name, \
                is_active = EXCLUDED.is_active, \
                last_sync_at = EXCLUDED.last_sync_at, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(input.instance_id)
            .bind(&input.remote_id)
            .bind(&input.name)
            .bind(input.is_active)
            .bind(input.synced_at)
            .fetch_one(pool)
            .await
    }

    /// Set the local active flag after a remote state change.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
        synced_at: Timestamp,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!(
            "UPDATE workflows SET is_active = $2, last_sync_at = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .bind(is_active)
            .bind(synced_at)
            .fetch_optional(pool)
            .await
    }

    /// Move `last_execution_at` forward to `at`. Never moves it backwards.
    pub async fn advance_last_execution(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflows \
             SET last_execution_at = GREATEST(COALESCE(last_execution_at, $2), $2), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
