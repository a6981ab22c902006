//! Handlers for the `/workflows` resource.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::Json;
use flowwatch_core::failure_counter::{CounterPhase, ErrorCounterState};
use flowwatch_core::types::DbId;
use flowwatch_db::models::error_counter::WorkflowErrorCounter;
use flowwatch_db::models::workflow::{Workflow, WorkflowFilter, WorkflowSummary};
use flowwatch_monitor::WorkflowSyncReport;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /workflows/sync`.
#[derive(Debug, Deserialize)]
pub struct SyncWorkflowsRequest {
    pub instance_id: DbId,
}

/// Node graph of a workflow as stored on its instance.
#[derive(Debug, Serialize)]
pub struct WorkflowNodes {
    pub nodes: Vec<serde_json::Value>,
    pub connections: serde_json::Value,
    pub settings: Option<serde_json::Value>,
}

/// Failure counter with its derived phase. `counter` is `None` until the
/// first terminal execution is processed.
#[derive(Debug, Serialize)]
pub struct ErrorCounterView {
    pub counter: Option<WorkflowErrorCounter>,
    pub phase: CounterPhase,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/workflows?instance_id&active&has_recent_errors
pub async fn list_workflows(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<WorkflowFilter>,
) -> AppResult<Json<DataResponse<Vec<WorkflowSummary>>>> {
    let workflows = state.store.list_workflows(auth.user_id, &filter).await?;
    Ok(Json(DataResponse { data: workflows }))
}

/// POST /api/v1/workflows/sync
pub async fn sync_workflows(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SyncWorkflowsRequest>,
) -> AppResult<Json<DataResponse<WorkflowSyncReport>>> {
    let report = state
        .monitor
        .sync_workflows(auth.user_id, input.instance_id)
        .await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/workflows/{id}/toggle
///
/// Flips the workflow on its instance and returns the mirrored row.
pub async fn toggle_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Workflow>>> {
    let workflow = state.monitor.toggle_workflow(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: workflow }))
}

/// GET /api/v1/workflows/{id}/nodes
///
/// Fetched live from the instance; nothing is cached.
pub async fn workflow_nodes(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkflowNodes>>> {
    let definition = state.monitor.workflow_definition(auth.user_id, id).await?;
    Ok(Json(DataResponse {
        data: WorkflowNodes {
            nodes: definition.nodes,
            connections: definition.connections,
            settings: definition.settings,
        },
    }))
}

/// GET /api/v1/workflows/{id}/error-counter
pub async fn get_error_counter(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ErrorCounterView>>> {
    let counter = state.monitor.error_counter(auth.user_id, id).await?;
    let phase = counter
        .as_ref()
        .map_or_else(|| ErrorCounterState::default().phase(), |c| c.phase());

    Ok(Json(DataResponse {
        data: ErrorCounterView { counter, phase },
    }))
}

/// POST /api/v1/workflows/{id}/error-counter/reset
///
/// Clears the failure streak and the auto-deactivation flag. The workflow's
/// remote state is not changed.
pub async fn reset_error_counter(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ErrorCounterView>>> {
    let counter = state.monitor.reset_error_counter(auth.user_id, id).await?;
    let phase = counter.phase();

    Ok(Json(DataResponse {
        data: ErrorCounterView {
            counter: Some(counter),
            phase,
        },
    }))
}
