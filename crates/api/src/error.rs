use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flowwatch_core::error::CoreError;
use flowwatch_monitor::{MonitorError, StoreError};
use flowwatch_n8n::N8nApiError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds storage, upstream and
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `flowwatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A remote instance failed or answered unexpectedly.
    #[error("Upstream error: {0}")]
    Upstream(#[from] N8nApiError),

    /// A remote operation ran out of time.
    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<MonitorError> for AppError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Core(e) => AppError::Core(e),
            MonitorError::Store(e) => AppError::Store(e),
            MonitorError::Upstream(e) => AppError::Upstream(e),
            e @ MonitorError::Timeout(_) => AppError::GatewayTimeout(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(err.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Storage errors ---
            AppError::Store(StoreError::Database(err)) => classify_sqlx_error(err),
            AppError::Store(StoreError::Backend(msg)) => {
                tracing::error!(error = %msg, "Storage error");
                internal()
            }

            // --- Remote instance errors ---
            AppError::Upstream(err) => {
                tracing::warn!(error = %err, "Upstream instance error");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", upstream_message(err))
            }
            AppError::GatewayTimeout(msg) => {
                tracing::warn!(error = %msg, "Upstream timeout");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_TIMEOUT",
                    "The instance did not respond in time".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Client-facing summary of an upstream failure. Response bodies from the
/// instance are logged, never echoed.
fn upstream_message(err: &N8nApiError) -> String {
    match err {
        N8nApiError::Api { status, .. } => format!("Instance responded with HTTP {status}"),
        N8nApiError::Request(_) => "Instance is unreachable".to_string(),
        N8nApiError::Decode(_) => "Instance returned an unexpected response".to_string(),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (SQLSTATE 23505) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Duplicate value violates unique constraint: {constraint}"),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
