//! Repository for the `executions` table.

use flowwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::execution::{Execution, ExecutionFilter, NewExecution};

/// Column list for `executions` queries.
const COLUMNS: &str = "\
    id, instance_id, workflow_id, remote_id, status, mode, \
    started_at, finished_at, payload, created_at, updated_at";

/// Same columns qualified with the `e` alias for joins.
const QUALIFIED_COLUMNS: &str = "\
    e.id, e.instance_id, e.workflow_id, e.remote_id, e.status, e.mode, \
    e.started_at, e.finished_at, e.payload, e.created_at, e.updated_at";

/// Provides query operations for mirrored executions.
pub struct ExecutionRepo;

impl ExecutionRepo {
    // ── Queries ──────────────────────────────────────────────────────

    /// Find an execution by its remote ID within one instance.
    pub async fn find_by_remote_id(
        pool: &PgPool,
        instance_id: DbId,
        remote_id: &str,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM executions WHERE instance_id = $1 AND remote_id = $2"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(instance_id)
            .bind(remote_id)
            .fetch_optional(pool)
            .await
    }

    /// Find an execution by ID, scoped to the instances a user owns.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM executions e \
             JOIN instances i ON i.id = e.instance_id \
             WHERE e.id = $1 AND i.user_id = $2"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's executions, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &ExecutionFilter,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM executions e \
             JOIN instances i ON i.id = e.instance_id \
             WHERE i.user_id = $1 \
               AND ($2::BIGINT IS NULL OR e.instance_id = $2) \
               AND ($3::BIGINT IS NULL OR e.workflow_id = $3) \
               AND ($4::TEXT IS NULL OR e.status = $4) \
             ORDER BY e.started_at DESC NULLS LAST, e.id DESC \
             LIMIT $5"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(user_id)
            .bind(filter.instance_id)
            .bind(filter.workflow_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.effective_limit())
            .fetch_all(pool)
            .await
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn create(pool: &PgPool, input: &NewExecution) -> Result<Execution, sqlx::Error> {
        let query = format!(
            "INSERT INTO executions \
                (instance_id, workflow_id, remote_id, status, mode, started_at, finished_at, payload) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(input.instance_id)
            .bind(input.workflow_id)
            .bind(&input.remote_id)
            .bind(input.status.as_str())
            .bind(&input.mode)
            .bind(input.started_at)
            .bind(input.finished_at)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    /// Overwrite the mutable fields of an existing execution.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &NewExecution,
    ) -> Result<Execution, sqlx::Error> {
        let query = format!(
            "UPDATE executions SET \
                workflow_id = $2, status = $3, mode = $4, \
                started_at = $5, finished_at = $6, payload = $7, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(id)
            .bind(input.workflow_id)
            .bind(input.status.as_str())
            .bind(&input.mode)
            .bind(input.started_at)
            .bind(input.finished_at)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }
}
