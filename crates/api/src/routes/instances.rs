//! Route definitions for the `/instances` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::instances;
use crate::state::AppState;

/// Routes mounted at `/instances`.
///
/// ```text
/// GET    /                  -> list_instances
/// POST   /                  -> create_instance
/// DELETE /{id}              -> delete_instance
/// POST   /{id}/test         -> test_instance
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(instances::list_instances).post(instances::create_instance),
        )
        .route("/{id}", delete(instances::delete_instance))
        .route("/{id}/test", post(instances::test_instance))
}
