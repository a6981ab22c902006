//! Route definitions for the `/monitor` resource.
//!
//! Guarded by [`CronAuth`](crate::middleware::auth::CronAuth) rather than a
//! user token.

use axum::routing::post;
use axum::Router;

use crate::handlers::monitor;
use crate::state::AppState;

/// Routes mounted at `/monitor`.
///
/// ```text
/// GET    /run               -> run_pass
/// POST   /run               -> run_pass
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/run", post(monitor::run_pass).get(monitor::run_pass))
}
