//! Executions mirrored from remote instances.

use flowwatch_core::execution::ExecutionStatus;
use flowwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default page size for execution listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum page size for execution listings.
pub const MAX_LIST_LIMIT: i64 = 200;

/// A row from the `executions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Execution {
    pub id: DbId,
    pub instance_id: DbId,
    /// `None` when the remote workflow was unknown at sync time.
    pub workflow_id: Option<DbId>,
    pub remote_id: String,
    pub status: String,
    pub mode: Option<String>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub payload: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Execution {
    /// Parsed status. Rows are constrained by a CHECK so this only fails on
    /// schema drift.
    pub fn status(&self) -> Option<ExecutionStatus> {
        ExecutionStatus::parse(&self.status)
    }
}

/// Insert/update payload for an execution.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub instance_id: DbId,
    pub workflow_id: Option<DbId>,
    pub remote_id: String,
    pub status: ExecutionStatus,
    pub mode: Option<String>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub payload: Option<serde_json::Value>,
}

/// Listing filters for executions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionFilter {
    pub instance_id: Option<DbId>,
    pub workflow_id: Option<DbId>,
    pub status: Option<ExecutionStatus>,
    pub limit: Option<i64>,
}

impl ExecutionFilter {
    /// Page size clamped to `1..=MAX_LIST_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_limit_defaults_and_clamps() {
        assert_eq!(ExecutionFilter::default().effective_limit(), 50);
        let filter = ExecutionFilter {
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 200);
        let filter = ExecutionFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 1);
    }
}
