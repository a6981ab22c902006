//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /logs              -> list_logs
/// POST   /test              -> send_test_push
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logs", get(notifications::list_logs))
        .route("/test", post(notifications::send_test_push))
}
