use axum::routing::post;
use axum::Router;

use crate::handlers::push;
use crate::state::AppState;

/// Routes mounted at `/push`.
///
/// ```text
/// POST   /subscribe         -> subscribe
/// POST   /unsubscribe       -> unsubscribe
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(push::subscribe))
        .route("/unsubscribe", post(push::unsubscribe))
}
