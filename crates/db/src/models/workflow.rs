//! Workflows mirrored from remote instances.

use flowwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `workflows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workflow {
    pub id: DbId,
    pub instance_id: DbId,
    pub remote_id: String,
    pub name: String,
    pub is_active: bool,
    pub last_sync_at: Option<Timestamp>,
    pub last_execution_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Workflow row joined with its instance name and most recent execution status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub workflow: Workflow,
    pub instance_name: String,
    pub last_execution_status: Option<String>,
}

/// Upsert payload keyed on `(instance_id, remote_id)`.
#[derive(Debug, Clone)]
pub struct UpsertWorkflow {
    pub instance_id: DbId,
    pub remote_id: String,
    pub name: String,
    pub is_active: bool,
    pub synced_at: Timestamp,
}

/// Listing filters. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowFilter {
    pub instance_id: Option<DbId>,
    pub active: Option<bool>,
    /// Only workflows whose most recent execution failed.
    pub has_recent_errors: Option<bool>,
}
