//! Handlers for the `/executions` resource.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::Json;
use flowwatch_core::types::DbId;
use flowwatch_db::models::execution::{Execution, ExecutionFilter};
use flowwatch_monitor::ExecutionSyncReport;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /executions/sync`.
#[derive(Debug, Deserialize)]
pub struct SyncExecutionsRequest {
    pub instance_id: DbId,
    /// Executions to fetch, `1..=200`. Defaults to 100.
    pub limit: Option<i64>,
    /// Remote id of a workflow to restrict the fetch to.
    pub workflow_id: Option<String>,
}

/// GET /api/v1/executions?instance_id&workflow_id&status&limit
///
/// Newest first. `limit` defaults to 50 and is capped at 200.
pub async fn list_executions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ExecutionFilter>,
) -> AppResult<Json<DataResponse<Vec<Execution>>>> {
    let executions = state.store.list_executions(auth.user_id, &filter).await?;
    Ok(Json(DataResponse { data: executions }))
}

/// POST /api/v1/executions/sync
///
/// Mirrors recent executions of one instance. Executions seen for the first
/// time go through failure tracking and may raise alerts.
pub async fn sync_executions(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SyncExecutionsRequest>,
) -> AppResult<Json<DataResponse<ExecutionSyncReport>>> {
    let report = state
        .monitor
        .sync_executions(auth.user_id, input.instance_id, input.limit, input.workflow_id)
        .await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/executions/{id}
pub async fn get_execution(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Execution>>> {
    let execution = state.monitor.execution(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: execution }))
}

/// POST /api/v1/executions/{id}/refresh
pub async fn refresh_execution(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Execution>>> {
    let execution = state.monitor.refresh_execution(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: execution }))
}
