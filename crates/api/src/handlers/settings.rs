//! Handlers for the `/settings` resource.

use axum::extract::State;
use axum::Json;
use flowwatch_core::alert_policy::{
    validate_auto_deactivate_threshold, validate_error_threshold, AlertPolicy,
};
use flowwatch_core::error::CoreError;
use flowwatch_db::models::user_settings::{UpdateUserSettings, UserSettings};
use flowwatch_events::AlertPayload;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Effective notification settings. Users who never saved any get the
/// defaults.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    #[serde(flatten)]
    pub policy: AlertPolicy,
    pub notification_email: Option<String>,
}

impl From<&UserSettings> for SettingsView {
    fn from(settings: &UserSettings) -> Self {
        Self {
            policy: settings.policy(),
            notification_email: settings.notification_email.clone(),
        }
    }
}

/// Body of `POST /settings/test-email`.
#[derive(Debug, Deserialize, Validate)]
pub struct TestEmailRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TestEmailResult {
    pub sent: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/settings
pub async fn get_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<SettingsView>>> {
    let view = match state.store.find_user_settings(auth.user_id).await? {
        Some(settings) => SettingsView::from(&settings),
        None => SettingsView {
            policy: AlertPolicy::default(),
            notification_email: None,
        },
    };
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/settings
///
/// Partial update; omitted fields keep their value. An empty
/// `notification_email` clears the address.
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateUserSettings>,
) -> AppResult<Json<DataResponse<SettingsView>>> {
    validate_update(&input)?;

    let settings = state
        .store
        .upsert_user_settings(auth.user_id, &input)
        .await?;

    tracing::info!(user_id = auth.user_id, "Notification settings updated");
    Ok(Json(DataResponse {
        data: SettingsView::from(&settings),
    }))
}

/// POST /api/v1/settings/test-email
pub async fn send_test_email(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<TestEmailRequest>,
) -> AppResult<Json<DataResponse<TestEmailResult>>> {
    input.validate()?;

    let result = state
        .dispatcher
        .send_email(&input.email, &AlertPayload::test_notification())
        .await
        .ok_or_else(|| AppError::BadRequest("Email delivery is not configured".into()))?;
    result.map_err(|e| AppError::InternalError(format!("test email failed: {e}")))?;

    tracing::info!(user_id = auth.user_id, "Test email sent");
    Ok(Json(DataResponse {
        data: TestEmailResult { sent: true },
    }))
}

fn validate_update(input: &UpdateUserSettings) -> Result<(), CoreError> {
    if let Some(threshold) = input.error_threshold {
        validate_error_threshold(threshold)?;
    }
    if let Some(threshold) = input.auto_deactivate_threshold {
        validate_auto_deactivate_threshold(threshold)?;
    }
    if let Some(email) = input.notification_email.as_deref() {
        let email = email.trim();
        if !email.is_empty() && !email.validate_email() {
            return Err(CoreError::Validation(
                "notification_email must be a valid address".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn empty_email_is_accepted_as_clear() {
        let input = UpdateUserSettings {
            notification_email: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_update(&input).is_ok());
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let input = UpdateUserSettings {
            error_threshold: Some(0),
            ..Default::default()
        };
        assert_matches!(validate_update(&input), Err(CoreError::Validation(_)));

        let input = UpdateUserSettings {
            auto_deactivate_threshold: Some(51),
            ..Default::default()
        };
        assert_matches!(validate_update(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let input = UpdateUserSettings {
            notification_email: Some("not-an-address".into()),
            ..Default::default()
        };
        assert_matches!(validate_update(&input), Err(CoreError::Validation(_)));
    }
}
