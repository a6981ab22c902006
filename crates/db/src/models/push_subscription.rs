use flowwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushSubscription {
    pub id: DbId,
    pub user_id: DbId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Browser subscription as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertPushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}
