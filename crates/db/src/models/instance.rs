//! Remote workflow-automation instances registered by users.

use flowwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `instances` table.
///
/// The API key is stored sealed and never leaves the service.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Instance {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key_sealed: Vec<u8>,
    pub is_active: bool,
    pub last_check_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload for a new instance. The key must already be sealed.
#[derive(Debug, Clone)]
pub struct CreateInstance {
    pub user_id: DbId,
    pub name: String,
    pub base_url: String,
    pub api_key_sealed: Vec<u8>,
}
