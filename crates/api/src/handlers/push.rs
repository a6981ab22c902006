//! Handlers for browser push subscriptions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use flowwatch_db::models::push_subscription::UpsertPushSubscription;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /push/subscribe`, shaped like the browser's
/// `PushSubscription.toJSON()`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(url(message = "endpoint must be a valid URL"))]
    pub endpoint: String,
    #[validate(nested)]
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubscriptionKeys {
    #[validate(length(min = 1))]
    pub p256dh: String,
    #[validate(length(min = 1))]
    pub auth: String,
}

/// Body of `POST /push/unsubscribe`.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// POST /api/v1/push/subscribe
///
/// Stores the subscription, or re-activates it if the endpoint is known.
pub async fn subscribe(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubscribeRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let subscription = state
        .store
        .upsert_push_subscription(
            auth.user_id,
            &UpsertPushSubscription {
                endpoint: input.endpoint,
                p256dh: input.keys.p256dh,
                auth: input.keys.auth,
            },
        )
        .await?;

    tracing::info!(
        user_id = auth.user_id,
        subscription_id = subscription.id,
        "Push subscription saved",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: subscription })))
}

/// POST /api/v1/push/unsubscribe
///
/// Idempotent: an unknown endpoint also yields 204.
pub async fn unsubscribe(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UnsubscribeRequest>,
) -> AppResult<StatusCode> {
    let removed = state
        .store
        .remove_push_subscription(auth.user_id, &input.endpoint)
        .await?;

    tracing::debug!(user_id = auth.user_id, removed, "Push unsubscribe");
    Ok(StatusCode::NO_CONTENT)
}
