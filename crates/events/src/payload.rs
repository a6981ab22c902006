//! Channel-neutral alert content.

use flowwatch_core::alert_policy::AlertKind;
use flowwatch_core::types::DbId;
use serde::Serialize;

/// Identifies what an alert is about.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub workflow_id: DbId,
    pub workflow_name: String,
    pub instance_id: DbId,
    pub instance_name: String,
    /// Local execution that triggered the alert, if any.
    pub execution_id: Option<DbId>,
}

/// An alert ready to be sent over any channel.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    /// Deep link into the dashboard.
    pub url: String,
    /// Structured details for clients and the notification log.
    pub data: serde_json::Value,
}

impl AlertPayload {
    /// A failed execution crossed the error threshold.
    pub fn execution_error(ctx: &AlertContext, error_message: &str, consecutive_errors: i32) -> Self {
        let mut body = error_message.to_string();
        if consecutive_errors > 1 {
            body.push_str(&format!("\n({consecutive_errors} consecutive errors)"));
        }
        let url = match ctx.execution_id {
            Some(id) => format!("/executions/{id}"),
            None => format!("/workflows/{}", ctx.workflow_id),
        };
        Self {
            kind: AlertKind::Error,
            title: format!("Workflow Error: {}", ctx.workflow_name),
            body,
            url,
            data: serde_json::json!({
                "type": "execution-error",
                "workflow_id": ctx.workflow_id,
                "instance_id": ctx.instance_id,
                "execution_id": ctx.execution_id,
                "error_message": error_message,
                "consecutive_errors": consecutive_errors,
            }),
        }
    }

    /// The workflow was deactivated on its instance after repeated failures.
    pub fn workflow_deactivated(ctx: &AlertContext, consecutive_errors: i32) -> Self {
        let reason = format!("Auto-deactivated after {consecutive_errors} consecutive errors");
        Self {
            kind: AlertKind::Warning,
            title: "Workflow Auto-Deactivated".to_string(),
            body: format!(
                "{} on {}\nReason: {reason}",
                ctx.workflow_name, ctx.instance_name
            ),
            url: format!("/workflows/{}", ctx.workflow_id),
            data: serde_json::json!({
                "type": "workflow-deactivated",
                "workflow_id": ctx.workflow_id,
                "instance_id": ctx.instance_id,
                "execution_id": ctx.execution_id,
                "reason": reason,
            }),
        }
    }

    /// Sent on request so a user can check that a channel works.
    pub fn test_notification() -> Self {
        Self {
            kind: AlertKind::Success,
            title: "Test Notification".to_string(),
            body: "Notifications are working. You will receive alerts for workflow errors."
                .to_string(),
            url: "/settings".to_string(),
            data: serde_json::json!({ "type": "test" }),
        }
    }

    /// A failing workflow succeeded again.
    pub fn workflow_recovered(ctx: &AlertContext) -> Self {
        Self {
            kind: AlertKind::Success,
            title: format!("Workflow Recovered: {}", ctx.workflow_name),
            body: format!(
                "{} on {} is running successfully again",
                ctx.workflow_name, ctx.instance_name
            ),
            url: format!("/workflows/{}", ctx.workflow_id),
            data: serde_json::json!({
                "type": "workflow-recovered",
                "workflow_id": ctx.workflow_id,
                "instance_id": ctx.instance_id,
                "execution_id": ctx.execution_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AlertContext {
        AlertContext {
            workflow_id: 7,
            workflow_name: "Sync CRM".into(),
            instance_id: 2,
            instance_name: "prod".into(),
            execution_id: Some(41),
        }
    }

    #[test]
    fn error_body_mentions_streak_only_above_one() {
        let single = AlertPayload::execution_error(&ctx(), "boom", 1);
        assert_eq!(single.body, "boom");
        assert_eq!(single.url, "/executions/41");

        let repeated = AlertPayload::execution_error(&ctx(), "boom", 3);
        assert!(repeated.body.ends_with("(3 consecutive errors)"));
        assert_eq!(repeated.kind, AlertKind::Error);
    }

    #[test]
    fn deactivation_is_a_warning_with_reason() {
        let payload = AlertPayload::workflow_deactivated(&ctx(), 5);
        assert_eq!(payload.kind, AlertKind::Warning);
        assert!(payload.body.contains("Sync CRM on prod"));
        assert_eq!(
            payload.data["reason"],
            "Auto-deactivated after 5 consecutive errors"
        );
    }

    #[test]
    fn recovery_links_to_workflow() {
        let payload = AlertPayload::workflow_recovered(&ctx());
        assert_eq!(payload.kind, AlertKind::Success);
        assert_eq!(payload.url, "/workflows/7");
    }
}
