//! Handlers for the `/instances` resource.
//!
//! All endpoints require authentication via [`AuthUser`] and only ever see
//! the caller's own instances.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use flowwatch_core::error::CoreError;
use flowwatch_core::types::DbId;
use flowwatch_db::models::instance::{CreateInstance, Instance};
use flowwatch_n8n::normalize_base_url;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /instances`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInstanceRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(url(message = "base_url must be a valid URL"))]
    pub base_url: String,
    #[validate(length(min = 1, message = "api_key is required"))]
    pub api_key: String,
}

/// An instance as shown to its owner. The key itself never leaves the server.
#[derive(Debug, Serialize)]
pub struct InstanceView {
    #[serde(flatten)]
    pub instance: Instance,
    pub has_api_key: bool,
}

impl From<Instance> for InstanceView {
    fn from(instance: Instance) -> Self {
        let has_api_key = !instance.api_key_sealed.is_empty();
        Self {
            instance,
            has_api_key,
        }
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Serialize)]
pub struct ConnectionTest {
    pub connected: bool,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/instances
pub async fn list_instances(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<InstanceView>>>> {
    let instances = state.store.list_instances_for_user(auth.user_id).await?;
    let data = instances.into_iter().map(InstanceView::from).collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/instances
///
/// Seals the API key, stores the instance once it answers, and mirrors its
/// workflows. Returns 201 Created.
pub async fn create_instance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateInstanceRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name must not be blank".into(),
        )));
    }

    let create = CreateInstance {
        user_id: auth.user_id,
        name: name.to_string(),
        base_url: normalize_base_url(&input.base_url),
        api_key_sealed: state.cipher.seal(input.api_key.trim())?,
    };
    let instance = state.monitor.register_instance(&create).await?;

    tracing::info!(
        instance_id = instance.id,
        user_id = auth.user_id,
        base_url = %instance.base_url,
        "Instance registered",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: InstanceView::from(instance),
        }),
    ))
}

/// DELETE /api/v1/instances/{id}
///
/// Removes the instance with its workflows, executions and counters.
pub async fn delete_instance(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store
        .delete_instance_for_user(id, auth.user_id)
        .await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Instance",
            id,
        }));
    }

    tracing::info!(instance_id = id, user_id = auth.user_id, "Instance deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/instances/{id}/test
pub async fn test_instance(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConnectionTest>>> {
    let connected = state.monitor.test_instance(auth.user_id, id).await?;
    let message = if connected {
        "Connection successful"
    } else {
        "Connection failed"
    };

    Ok(Json(DataResponse {
        data: ConnectionTest { connected, message },
    }))
}
