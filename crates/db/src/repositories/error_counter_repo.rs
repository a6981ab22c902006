//! Repository for the `workflow_error_counters` table.

use flowwatch_core::failure_counter::ErrorCounterState;
use flowwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::error_counter::WorkflowErrorCounter;

/// Column list for `workflow_error_counters` queries.
const COLUMNS: &str = "\
    id, workflow_id, consecutive_errors, total_errors, \
    last_error_at, last_success_at, is_auto_deactivated, created_at, updated_at";

/// Provides query operations for per-workflow error counters.
///
/// Rows are created lazily by [`ErrorCounterRepo::save`].
pub struct ErrorCounterRepo;

impl ErrorCounterRepo {
    pub async fn find_by_workflow(
        pool: &PgPool,
        workflow_id: DbId,
    ) -> Result<Option<WorkflowErrorCounter>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM workflow_error_counters WHERE workflow_id = $1");
        sqlx::query_as::<_, WorkflowErrorCounter>(&query)
            .bind(workflow_id)
            .fetch_optional(pool)
            .await
    }

    /// Write the full counter state, creating the row on first use.
    pub async fn save(
        pool: &PgPool,
        workflow_id: DbId,
        state: &ErrorCounterState,
    ) -> Result<WorkflowErrorCounter, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_error_counters \
                (workflow_id, consecutive_errors, total_errors, \
                 last_error_at, last_success_at, is_auto_deactivated) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (workflow_id) DO UPDATE SET \
                consecutive_errors = EXCLUDED.consecutive_errors, \
                total_errors = EXCLUDED.total_errors, \
                last_error_at = EXCLUDED.last_error_at, \
                last_success_at = EXCLUDED.last_success_at, \
                is_auto_deactivated = EXCLUDED.is_auto_deactivated, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowErrorCounter>(&query)
            .bind(workflow_id)
            .bind(state.consecutive_errors)
            .bind(state.total_errors)
            .bind(state.last_error_at)
            .bind(state.last_success_at)
            .bind(state.is_auto_deactivated)
            .fetch_one(pool)
            .await
    }
}
