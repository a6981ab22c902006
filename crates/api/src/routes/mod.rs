pub mod executions;
pub mod health;
pub mod instances;
pub mod monitor;
pub mod notifications;
pub mod push;
pub mod settings;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /instances                                list, register
/// /instances/{id}                           delete
/// /instances/{id}/test                      connectivity probe (POST)
///
/// /workflows                                filtered list
/// /workflows/sync                           sync from an instance (POST)
/// /workflows/{id}/toggle                    flip active state (POST)
/// /workflows/{id}/nodes                     remote node graph
/// /workflows/{id}/error-counter             counter and phase
/// /workflows/{id}/error-counter/reset       clear the failure streak (POST)
///
/// /executions                               filtered list
/// /executions/sync                          sync from an instance (POST)
/// /executions/{id}                          detail
/// /executions/{id}/refresh                  re-fetch from the instance (POST)
///
/// /notifications/logs                       alert history
/// /notifications/test                       test push (POST)
///
/// /settings                                 get, update
/// /settings/test-email                      test email (POST)
///
/// /push/subscribe                           store a subscription (POST)
/// /push/unsubscribe                         remove a subscription (POST)
///
/// /monitor/run                              one monitoring pass (cron)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/instances", instances::router())
        .nest("/workflows", workflows::router())
        .nest("/executions", executions::router())
        .nest("/notifications", notifications::router())
        .nest("/settings", settings::router())
        .nest("/push", push::router())
        .nest("/monitor", monitor::router())
}
