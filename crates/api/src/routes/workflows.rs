//! Route definitions for the `/workflows` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::workflows;
use crate::state::AppState;

/// Routes mounted at `/workflows`.
///
/// ```text
/// GET    /                          -> list_workflows
/// POST   /sync                      -> sync_workflows
/// POST   /{id}/toggle               -> toggle_workflow
/// GET    /{id}/nodes                -> workflow_nodes
/// GET    /{id}/error-counter        -> get_error_counter
/// POST   /{id}/error-counter/reset  -> reset_error_counter
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(workflows::list_workflows))
        .route("/sync", post(workflows::sync_workflows))
        .route("/{id}/toggle", post(workflows::toggle_workflow))
        .route("/{id}/nodes", get(workflows::workflow_nodes))
        .route("/{id}/error-counter", get(workflows::get_error_counter))
        .route(
            "/{id}/error-counter/reset",
            post(workflows::reset_error_counter),
        )
}
