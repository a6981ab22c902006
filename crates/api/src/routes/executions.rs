//! Route definitions for the `/executions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::executions;
use crate::state::AppState;

/// Routes mounted at `/executions`.
///
/// ```text
/// GET    /                  -> list_executions
/// POST   /sync              -> sync_executions
/// GET    /{id}              -> get_execution
/// POST   /{id}/refresh      -> refresh_execution
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(executions::list_executions))
        .route("/sync", post(executions::sync_executions))
        .route("/{id}", get(executions::get_execution))
        .route("/{id}/refresh", post(executions::refresh_execution))
}
