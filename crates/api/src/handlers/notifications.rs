//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Query, State};
use axum::Json;
use flowwatch_db::models::notification_log::{LogPage, NotificationLog};
use flowwatch_events::AlertPayload;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for log listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for log listing.
const DEFAULT_LIMIT: i64 = 50;

/// Query parameters for `GET /notifications/logs`.
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TestPushResult {
    pub sent: usize,
    pub failed: usize,
}

/// GET /api/v1/notifications/logs
///
/// The caller's alert history, newest first.
pub async fn list_logs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LogQuery>,
) -> AppResult<Json<DataResponse<Vec<NotificationLog>>>> {
    let page = LogPage {
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset: params.offset.unwrap_or(0).max(0),
    };

    let logs = state
        .store
        .list_notification_logs(auth.user_id, page)
        .await?;
    Ok(Json(DataResponse { data: logs }))
}

/// POST /api/v1/notifications/test
///
/// Pushes a test notification to every active subscription of the caller.
/// Not recorded in the log.
pub async fn send_test_push(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<TestPushResult>>> {
    let outcome = state
        .dispatcher
        .dispatch(auth.user_id, &AlertPayload::test_notification())
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    if outcome.sent == 0 && outcome.failed == 0 {
        return Err(AppError::BadRequest(
            "No active push subscriptions found. Enable notifications first.".into(),
        ));
    }

    Ok(Json(DataResponse {
        data: TestPushResult {
            sent: outcome.sent,
            failed: outcome.failed,
        },
    }))
}
