//! Execution status normalization and payload helpers.
//!
//! Remote instances report execution state inconsistently across versions:
//! newer releases send an explicit `status` string, older ones only expose
//! `finished` and `stoppedAt`. Everything downstream of the sync works with
//! the normalized [`ExecutionStatus`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of remote executions fetched per sync call.
pub const DEFAULT_SYNC_LIMIT: i64 = 100;

/// Hard ceiling on remote executions fetched per sync call.
pub const MAX_SYNC_LIMIT: i64 = 200;

/// Smallest accepted sync limit.
pub const MIN_SYNC_LIMIT: i64 = 1;

/// Fallback message when a failed execution carries no error details.
pub const GENERIC_FAILURE_MESSAGE: &str = "Workflow execution failed";

/// Fallback message when an execution has no payload at all.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

/// Normalized status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
    Running,
    Waiting,
    Canceled,
}

impl ExecutionStatus {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Waiting => "waiting",
            ExecutionStatus::Canceled => "canceled",
        }
    }

    /// Parse a stored or remote status string.
    ///
    /// Accepts the remote aliases (`crashed`, `failed`, `new`, `cancelled`).
    /// Returns `None` for anything unrecognized so callers can fall back to
    /// inference.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Some(ExecutionStatus::Success),
            "error" | "crashed" | "failed" => Some(ExecutionStatus::Error),
            "running" => Some(ExecutionStatus::Running),
            "waiting" | "new" => Some(ExecutionStatus::Waiting),
            "canceled" | "cancelled" => Some(ExecutionStatus::Canceled),
            _ => None,
        }
    }

    /// Whether this status ends a run (success, error or canceled).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Error | ExecutionStatus::Canceled
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the normalized status of a remote execution.
///
/// An explicit, recognized status wins. Otherwise a finished run counts as
/// `success`, a run that stopped without finishing counts as `error`, and
/// anything else is still `running`.
pub fn derive_status(explicit: Option<&str>, finished: bool, stopped: bool) -> ExecutionStatus {
    if let Some(status) = explicit.and_then(ExecutionStatus::parse) {
        return status;
    }
    if finished {
        ExecutionStatus::Success
    } else if stopped {
        ExecutionStatus::Error
    } else {
        ExecutionStatus::Running
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Resolve an optional sync limit to a value within
/// `[MIN_SYNC_LIMIT, MAX_SYNC_LIMIT]`, defaulting to [`DEFAULT_SYNC_LIMIT`].
///
/// Out-of-range values are rejected rather than clamped.
pub fn validate_sync_limit(limit: Option<i64>) -> Result<i64, CoreError> {
    let limit = limit.unwrap_or(DEFAULT_SYNC_LIMIT);
    if !(MIN_SYNC_LIMIT..=MAX_SYNC_LIMIT).contains(&limit) {
        return Err(CoreError::Validation(format!(
            "limit must be between {MIN_SYNC_LIMIT} and {MAX_SYNC_LIMIT}, got {limit}"
        )));
    }
    Ok(limit)
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Pull a human-readable error message out of a stored execution payload.
///
/// Looks at `data.resultData.error.message` first, then `error.message`.
pub fn extract_error_message(payload: Option<&serde_json::Value>) -> String {
    let Some(payload) = payload.filter(|p| !p.is_null()) else {
        return UNKNOWN_ERROR_MESSAGE.to_string();
    };

    let candidates = [
        payload.pointer("/data/resultData/error/message"),
        payload.pointer("/error/message"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
