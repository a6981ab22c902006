use flowwatch_core::failure_counter::{CounterPhase, ErrorCounterState};
use flowwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workflow_error_counters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowErrorCounter {
    pub id: DbId,
    pub workflow_id: DbId,
    pub consecutive_errors: i32,
    pub total_errors: i32,
    pub last_error_at: Option<Timestamp>,
    pub last_success_at: Option<Timestamp>,
    pub is_auto_deactivated: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowErrorCounter {
    /// Counter values as the state machine sees them.
    pub fn state(&self) -> ErrorCounterState {
        ErrorCounterState {
            consecutive_errors: self.consecutive_errors,
            total_errors: self.total_errors,
            last_error_at: self.last_error_at,
            last_success_at: self.last_success_at,
            is_auto_deactivated: self.is_auto_deactivated,
        }
    }

    pub fn phase(&self) -> CounterPhase {
        self.state().phase()
    }
}
