//! Feeds newly observed executions through the failure counter and carries
//! out whatever the transition asks for.
//!
//! Per execution, in order: persist the counter, send the error alert,
//! deactivate the workflow remotely, send the recovery notice. Alerting and
//! deactivation are independent: a failed remote deactivation leaves the
//! counter unmarked so the next qualifying error tries again.

use std::sync::Arc;

use chrono::Utc;
use flowwatch_core::alert_policy::AlertPolicy;
use flowwatch_core::execution::{extract_error_message, ExecutionStatus};
use flowwatch_core::failure_counter;
use flowwatch_core::types::DbId;
use flowwatch_db::models::execution::Execution;
use flowwatch_db::models::instance::Instance;
use flowwatch_db::models::notification_log::NewNotificationLog;
use flowwatch_db::models::user_settings::UserSettings;
use flowwatch_db::models::workflow::Workflow;
use flowwatch_events::{AlertContext, AlertPayload, NotificationDispatcher, Recipient};

use crate::connector::RemoteConnector;
use crate::error::MonitorError;
use crate::store::MonitorStore;

/// What processing one execution did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Alerts handed to the dispatcher.
    pub alerts: usize,
    /// The workflow was deactivated on its instance.
    pub deactivated: bool,
    /// A failure streak ended.
    pub recovered: bool,
}

#[derive(Clone)]
pub struct FailureMonitor {
    store: Arc<dyn MonitorStore>,
    connector: Arc<dyn RemoteConnector>,
    dispatcher: NotificationDispatcher,
}

impl FailureMonitor {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        connector: Arc<dyn RemoteConnector>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            connector,
            dispatcher,
        }
    }

    /// Apply one newly created execution to its workflow's failure counter.
    ///
    /// Executions without a workflow link or with a non-terminal status are
    /// ignored.
    pub async fn process_execution(
        &self,
        execution: &Execution,
    ) -> Result<ProcessOutcome, MonitorError> {
        let mut outcome = ProcessOutcome::default();

        let Some(workflow_id) = execution.workflow_id else {
            return Ok(outcome);
        };
        let Some(status) = execution.status() else {
            tracing::warn!(
                execution_id = execution.id,
                status = %execution.status,
                "Skipping execution with unrecognized status",
            );
            return Ok(outcome);
        };
        if !matches!(status, ExecutionStatus::Error | ExecutionStatus::Success) {
            return Ok(outcome);
        }

        let workflow = self
            .store
            .find_workflow(workflow_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("workflow", workflow_id))?;
        let instance = self
            .store
            .find_instance(workflow.instance_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("instance", workflow.instance_id))?;
        let settings = self.store.find_user_settings(instance.user_id).await?;
        let policy = settings
            .as_ref()
            .map(UserSettings::policy)
            .unwrap_or_default();

        let before = self
            .store
            .find_error_counter(workflow.id)
            .await?
            .map(|counter| counter.state())
            .unwrap_or_default();

        let now = Utc::now();
        let transition = failure_counter::apply(&before, status, workflow.is_active, &policy, now);
        let mut state = transition.state.clone();
        if transition.is_mutation(&before) {
            self.store.save_error_counter(workflow.id, &state).await?;
        }

        let mut recipient = LazyRecipient::new(instance.user_id, settings.as_ref(), &policy);
        let ctx = AlertContext {
            workflow_id: workflow.id,
            workflow_name: workflow.name.clone(),
            instance_id: instance.id,
            instance_name: instance.name.clone(),
            execution_id: Some(execution.id),
        };

        if transition.alert_error {
            let message = extract_error_message(execution.payload.as_ref());
            let payload = AlertPayload::execution_error(&ctx, &message, state.consecutive_errors);
            if self.alert(&mut recipient, &ctx, &payload).await {
                outcome.alerts += 1;
            }
        }

        if transition.deactivate {
            match self.deactivate(&instance, &workflow).await {
                Ok(()) => {
                    state.mark_auto_deactivated();
                    self.store.save_error_counter(workflow.id, &state).await?;
                    outcome.deactivated = true;
                    tracing::warn!(
                        workflow_id = workflow.id,
                        instance_id = instance.id,
                        consecutive_errors = state.consecutive_errors,
                        "Workflow auto-deactivated",
                    );

                    if policy.notify_on_warning {
                        let payload =
                            AlertPayload::workflow_deactivated(&ctx, state.consecutive_errors);
                        if self.alert(&mut recipient, &ctx, &payload).await {
                            outcome.alerts += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        workflow_id = workflow.id,
                        instance_id = instance.id,
                        error = %e,
                        "Auto-deactivation failed",
                    );
                }
            }
        }

        if transition.recovered {
            outcome.recovered = true;
            if policy.notify_on_success {
                let payload = AlertPayload::workflow_recovered(&ctx);
                if self.alert(&mut recipient, &ctx, &payload).await {
                    outcome.alerts += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Dispatch an alert and record it. Returns whether it was attempted.
    ///
    /// A failed recipient lookup skips this alert only.
    async fn alert(
        &self,
        recipient: &mut LazyRecipient<'_>,
        ctx: &AlertContext,
        payload: &AlertPayload,
    ) -> bool {
        let recipient = match recipient.resolve(self.store.as_ref()).await {
            Ok(recipient) => recipient,
            Err(e) => {
                tracing::warn!(
                    workflow_id = ctx.workflow_id,
                    kind = %payload.kind,
                    error = %e,
                    "Failed to resolve alert recipient",
                );
                return false;
            }
        };
        if !recipient.has_channel() {
            tracing::debug!(
                user_id = recipient.user_id,
                kind = %payload.kind,
                "No alert channel enabled",
            );
            return false;
        }

        let report = self.dispatcher.notify(recipient, payload).await;
        let entry = NewNotificationLog {
            user_id: recipient.user_id,
            workflow_id: Some(ctx.workflow_id),
            instance_id: Some(ctx.instance_id),
            execution_id: ctx.execution_id,
            kind: payload.kind,
            title: payload.title.clone(),
            message: payload.body.clone(),
            metadata: payload.data.clone(),
            sent: report.delivered(),
        };
        if let Err(e) = self.store.append_notification_log(&entry).await {
            tracing::warn!(
                user_id = recipient.user_id,
                workflow_id = ctx.workflow_id,
                error = %e,
                "Failed to record notification",
            );
        }
        true
    }

    async fn deactivate(&self, instance: &Instance, workflow: &Workflow) -> Result<(), MonitorError> {
        let api = self.connector.connect(instance)?;
        api.deactivate_workflow(&workflow.remote_id).await?;
        self.store
            .set_workflow_active(workflow.id, false, Utc::now())
            .await?;
        Ok(())
    }
}

/// Alert channels of a user, looked up on the first alert that needs them.
///
/// Email goes to the configured notification address, or to the account
/// email when none is set.
struct LazyRecipient<'a> {
    user_id: DbId,
    settings: Option<&'a UserSettings>,
    policy: &'a AlertPolicy,
    resolved: Option<Recipient>,
}

impl<'a> LazyRecipient<'a> {
    fn new(user_id: DbId, settings: Option<&'a UserSettings>, policy: &'a AlertPolicy) -> Self {
        Self {
            user_id,
            settings,
            policy,
            resolved: None,
        }
    }

    async fn resolve(&mut self, store: &dyn MonitorStore) -> Result<&Recipient, MonitorError> {
        let recipient = match self.resolved.take() {
            Some(recipient) => recipient,
            None => {
                let email = if self.policy.email_notifications_enabled {
                    match self.settings.and_then(|s| s.notification_email.clone()) {
                        Some(address) => Some(address),
                        None => store.find_user_email(self.user_id).await?,
                    }
                } else {
                    None
                };
                Recipient {
                    user_id: self.user_id,
                    push: self.policy.push_notifications_enabled,
                    email,
                }
            }
        };
        Ok(self.resolved.insert(recipient))
    }
}
