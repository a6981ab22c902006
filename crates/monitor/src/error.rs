use flowwatch_core::error::CoreError;
use flowwatch_core::types::DbId;
use flowwatch_n8n::N8nApiError;

/// Failure of the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend-specific failure without a richer type.
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Error type for monitoring and reconciliation operations.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The remote instance rejected the call or could not be reached.
    #[error("Upstream error: {0}")]
    Upstream(#[from] N8nApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Work on one instance exceeded its time budget.
    #[error("Instance {0} timed out")]
    Timeout(DbId),
}

impl MonitorError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        MonitorError::Core(CoreError::NotFound { entity, id })
    }
}

impl From<sqlx::Error> for MonitorError {
    fn from(err: sqlx::Error) -> Self {
        MonitorError::Store(StoreError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn not_found_wraps_core_error() {
        let err = MonitorError::not_found("workflow", 4);
        assert_matches!(
            err,
            MonitorError::Core(CoreError::NotFound {
                entity: "workflow",
                id: 4
            })
        );
        assert_eq!(
            MonitorError::not_found("instance", 9).to_string(),
            "Entity not found: instance with id 9"
        );
    }

    #[test]
    fn timeout_display() {
        assert_eq!(MonitorError::Timeout(3).to_string(), "Instance 3 timed out");
    }
}
