//! Cron trigger for the monitoring pass.

use axum::extract::State;
use axum::Json;
use flowwatch_monitor::PassReport;

use crate::error::AppResult;
use crate::middleware::auth::CronAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET|POST /api/v1/monitor/run
///
/// Runs one pass over every active instance and reports what it did. Busy
/// instances are skipped, so overlapping triggers are harmless.
pub async fn run_pass(
    _cron: CronAuth,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PassReport>>> {
    let report = state.monitor.run_pass().await?;
    Ok(Json(DataResponse { data: report }))
}
