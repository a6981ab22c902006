//! Per-user alerting thresholds and channel toggles.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default consecutive errors before an error alert fires.
pub const DEFAULT_ERROR_THRESHOLD: i32 = 1;

/// Default consecutive errors before a workflow is auto-deactivated.
pub const DEFAULT_AUTO_DEACTIVATE_THRESHOLD: i32 = 3;

/// Upper bound accepted for `error_threshold`.
pub const MAX_ERROR_THRESHOLD: i32 = 20;

/// Upper bound accepted for `auto_deactivate_threshold`.
pub const MAX_AUTO_DEACTIVATE_THRESHOLD: i32 = 50;

// ---------------------------------------------------------------------------
// AlertPolicy
// ---------------------------------------------------------------------------

/// Notification preferences that drive the failure monitor.
///
/// A user without a stored settings row gets [`AlertPolicy::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub notify_on_error: bool,
    pub error_threshold: i32,
    pub notify_on_success: bool,
    pub notify_on_warning: bool,
    pub auto_deactivate_workflow: bool,
    pub auto_deactivate_threshold: i32,
    pub push_notifications_enabled: bool,
    pub email_notifications_enabled: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            notify_on_error: true,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            notify_on_success: false,
            notify_on_warning: true,
            auto_deactivate_workflow: false,
            auto_deactivate_threshold: DEFAULT_AUTO_DEACTIVATE_THRESHOLD,
            push_notifications_enabled: false,
            email_notifications_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AlertKind
// ---------------------------------------------------------------------------

/// Category of an alert, stored on every notification log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// A failed execution crossed the error threshold.
    Error,
    /// The workflow was auto-deactivated.
    Warning,
    /// A failing workflow recovered.
    Success,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Error => "error",
            AlertKind::Warning => "warning",
            AlertKind::Success => "success",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that `error_threshold` is within `1..=MAX_ERROR_THRESHOLD`.
pub fn validate_error_threshold(value: i32) -> Result<(), CoreError> {
    validate_range(value, 1, MAX_ERROR_THRESHOLD, "error_threshold")
}

/// Validate that `auto_deactivate_threshold` is within
/// `1..=MAX_AUTO_DEACTIVATE_THRESHOLD`.
pub fn validate_auto_deactivate_threshold(value: i32) -> Result<(), CoreError> {
    validate_range(
        value,
        1,
        MAX_AUTO_DEACTIVATE_THRESHOLD,
        "auto_deactivate_threshold",
    )
}

fn validate_range(value: i32, min: i32, max: i32, field: &str) -> Result<(), CoreError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_notify_every_error_without_deactivation() {
        let policy = AlertPolicy::default();
        assert!(policy.notify_on_error);
        assert_eq!(policy.error_threshold, 1);
        assert!(!policy.auto_deactivate_workflow);
        assert_eq!(policy.auto_deactivate_threshold, 3);
    }

    #[test]
    fn threshold_bounds() {
        assert!(validate_error_threshold(1).is_ok());
        assert!(validate_error_threshold(20).is_ok());
        assert!(validate_error_threshold(0).is_err());
        assert!(validate_error_threshold(21).is_err());
        assert!(validate_auto_deactivate_threshold(50).is_ok());
        assert!(validate_auto_deactivate_threshold(51).is_err());
    }
}
