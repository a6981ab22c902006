//! Entry points for the scheduled monitoring pass and user-triggered
//! reconciliation.

use std::sync::Arc;

use chrono::Utc;
use flowwatch_core::error::CoreError;
use flowwatch_core::execution::validate_sync_limit;
use flowwatch_core::failure_counter;
use flowwatch_core::types::DbId;
use flowwatch_db::models::error_counter::WorkflowErrorCounter;
use flowwatch_db::models::execution::Execution;
use flowwatch_db::models::instance::{CreateInstance, Instance};
use flowwatch_db::models::workflow::Workflow;
use flowwatch_events::NotificationDispatcher;
use flowwatch_n8n::RemoteWorkflow;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::alerting::FailureMonitor;
use crate::config::MonitorConfig;
use crate::connector::RemoteConnector;
use crate::error::MonitorError;
use crate::locks::InstanceLocks;
use crate::reconcile::{
    to_new_execution, ExecutionSyncReport, ExecutionSyncRequest, Reconciler, WorkflowSyncReport,
};
use crate::store::MonitorStore;

/// Summary of one monitoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Active instances found.
    pub instances: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Instances skipped because another reconciliation held their lock.
    pub skipped: usize,
    /// Executions seen for the first time.
    pub new_executions: usize,
    pub alerts: usize,
    pub deactivated: usize,
}

enum InstanceOutcome {
    Done(PassReport),
    Failed,
    Skipped,
}

#[derive(Clone)]
pub struct MonitorService {
    store: Arc<dyn MonitorStore>,
    connector: Arc<dyn RemoteConnector>,
    reconciler: Reconciler,
    monitor: FailureMonitor,
    locks: InstanceLocks,
    config: MonitorConfig,
}

impl MonitorService {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        connector: Arc<dyn RemoteConnector>,
        dispatcher: NotificationDispatcher,
        config: MonitorConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone()),
            monitor: FailureMonitor::new(store.clone(), connector.clone(), dispatcher),
            store,
            connector,
            locks: InstanceLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Per-instance locks shared by every reconciliation path.
    pub fn locks(&self) -> &InstanceLocks {
        &self.locks
    }

    // ---- Scheduled pass ----

    /// Reconcile every active instance once.
    ///
    /// Instances run concurrently up to the configured limit. A failing or
    /// slow instance is counted and logged; it never stops the others.
    pub async fn run_pass(&self) -> Result<PassReport, MonitorError> {
        let instances = self.store.list_active_instances().await?;
        let mut report = PassReport {
            instances: instances.len(),
            ..Default::default()
        };

        let outcomes: Vec<InstanceOutcome> = stream::iter(instances)
            .map(|instance| self.run_instance(instance))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                InstanceOutcome::Done(partial) => {
                    report.succeeded += 1;
                    report.new_executions += partial.new_executions;
                    report.alerts += partial.alerts;
                    report.deactivated += partial.deactivated;
                }
                InstanceOutcome::Failed => report.failed += 1,
                InstanceOutcome::Skipped => report.skipped += 1,
            }
        }

        tracing::info!(
            instances = report.instances,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            new_executions = report.new_executions,
            alerts = report.alerts,
            "Monitoring pass complete",
        );
        Ok(report)
    }

    async fn run_instance(&self, instance: Instance) -> InstanceOutcome {
        let Some(_guard) = self.locks.try_acquire(instance.id) else {
            tracing::debug!(instance_id = instance.id, "Instance busy, skipping");
            return InstanceOutcome::Skipped;
        };

        match tokio::time::timeout(self.config.instance_timeout, self.reconcile_instance(&instance))
            .await
        {
            Ok(Ok(report)) => InstanceOutcome::Done(report),
            Ok(Err(e)) => {
                tracing::error!(instance_id = instance.id, error = %e, "Instance reconciliation failed");
                InstanceOutcome::Failed
            }
            Err(_) => {
                let e = MonitorError::Timeout(instance.id);
                tracing::error!(instance_id = instance.id, error = %e, "Instance reconciliation failed");
                InstanceOutcome::Failed
            }
        }
    }

    /// Workflows, then executions, then the failure monitor.
    ///
    /// `last_check_at` is stamped once the workflow sync succeeded, even if
    /// the execution sync then fails.
    async fn reconcile_instance(&self, instance: &Instance) -> Result<PassReport, MonitorError> {
        let api = self.connector.connect(instance)?;
        self.reconciler.sync_workflows(instance, api.as_ref()).await?;

        let request = ExecutionSyncRequest {
            limit: self.config.execution_limit,
            workflow_remote_id: None,
        };
        let synced = self
            .reconciler
            .sync_executions(instance, api.as_ref(), &request)
            .await;
        self.store
            .touch_instance_last_check(instance.id, Utc::now())
            .await?;
        let synced = synced?;

        let mut report = self.process_new_executions(synced.new_executions).await;
        report.new_executions = synced.created;
        Ok(report)
    }

    /// Feed executions to the failure monitor, oldest first.
    async fn process_new_executions(&self, mut executions: Vec<Execution>) -> PassReport {
        executions.sort_by_key(|e| (e.started_at.is_some(), e.started_at, e.id));

        let mut report = PassReport::default();
        for execution in &executions {
            match self.monitor.process_execution(execution).await {
                Ok(outcome) => {
                    report.alerts += outcome.alerts;
                    report.deactivated += usize::from(outcome.deactivated);
                }
                Err(e) => {
                    tracing::warn!(
                        execution_id = execution.id,
                        error = %e,
                        "Failed to process execution",
                    );
                }
            }
        }
        report
    }

    // ---- User-triggered operations ----

    async fn owned_instance(&self, user_id: DbId, instance_id: DbId) -> Result<Instance, MonitorError> {
        self.store
            .find_instance_for_user(instance_id, user_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("instance", instance_id))
    }

    async fn owned_workflow(&self, user_id: DbId, workflow_id: DbId) -> Result<Workflow, MonitorError> {
        self.store
            .find_workflow_for_user(workflow_id, user_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("workflow", workflow_id))
    }

    async fn workflow_instance(&self, workflow: &Workflow) -> Result<Instance, MonitorError> {
        self.store
            .find_instance(workflow.instance_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("instance", workflow.instance_id))
    }

    /// Store a new instance if it answers with the given credential, then
    /// mirror its workflows.
    ///
    /// An unreachable instance is removed again and reported as a validation
    /// error. A failed initial workflow sync is logged; the next pass retries.
    pub async fn register_instance(&self, input: &CreateInstance) -> Result<Instance, MonitorError> {
        let instance = self.store.create_instance(input).await?;

        let connected = match self.connector.connect(&instance) {
            Ok(api) => api.test_connection().await,
            Err(e) => {
                tracing::warn!(instance_id = instance.id, error = %e, "Cannot build client for new instance");
                false
            }
        };
        if !connected {
            self.store
                .delete_instance_for_user(instance.id, instance.user_id)
                .await?;
            return Err(CoreError::Validation(
                "Failed to connect to the instance. Check the URL and API key.".into(),
            )
            .into());
        }

        let now = Utc::now();
        self.store.touch_instance_last_check(instance.id, now).await?;

        match self.sync_workflows(instance.user_id, instance.id).await {
            Ok(report) => {
                tracing::info!(instance_id = instance.id, synced = report.synced, "Instance registered");
            }
            Err(e) => {
                tracing::warn!(instance_id = instance.id, error = %e, "Initial workflow sync failed");
            }
        }

        self.store
            .find_instance(instance.id)
            .await?
            .ok_or_else(|| MonitorError::not_found("instance", instance.id))
    }

    /// Sync recent executions of one of the user's instances and feed the new
    /// ones to the failure monitor.
    pub async fn sync_executions(
        &self,
        user_id: DbId,
        instance_id: DbId,
        limit: Option<i64>,
        workflow_remote_id: Option<String>,
    ) -> Result<ExecutionSyncReport, MonitorError> {
        let limit = validate_sync_limit(limit)?;
        let instance = self.owned_instance(user_id, instance_id).await?;
        let _guard = self.locks.acquire(instance.id).await;

        let api = self.connector.connect(&instance)?;
        let request = ExecutionSyncRequest {
            limit,
            workflow_remote_id,
        };
        let report = self
            .reconciler
            .sync_executions(&instance, api.as_ref(), &request)
            .await?;
        self.store
            .touch_instance_last_check(instance.id, Utc::now())
            .await?;

        self.process_new_executions(report.new_executions.clone())
            .await;
        Ok(report)
    }

    pub async fn sync_workflows(
        &self,
        user_id: DbId,
        instance_id: DbId,
    ) -> Result<WorkflowSyncReport, MonitorError> {
        let instance = self.owned_instance(user_id, instance_id).await?;
        let _guard = self.locks.acquire(instance.id).await;

        let api = self.connector.connect(&instance)?;
        let report = self.reconciler.sync_workflows(&instance, api.as_ref()).await?;
        self.store
            .touch_instance_last_check(instance.id, Utc::now())
            .await?;
        Ok(report)
    }

    /// Flip a workflow's active state on its instance and mirror the result.
    ///
    /// The auto-deactivation flag is left alone; only
    /// [`reset_error_counter`](Self::reset_error_counter) clears it.
    pub async fn toggle_workflow(
        &self,
        user_id: DbId,
        workflow_id: DbId,
    ) -> Result<Workflow, MonitorError> {
        let workflow = self.owned_workflow(user_id, workflow_id).await?;
        let instance = self.workflow_instance(&workflow).await?;

        let api = self.connector.connect(&instance)?;
        let remote = if workflow.is_active {
            api.deactivate_workflow(&workflow.remote_id).await?
        } else {
            api.activate_workflow(&workflow.remote_id).await?
        };

        let updated = self
            .store
            .set_workflow_active(workflow.id, remote.active, Utc::now())
            .await?
            .ok_or_else(|| MonitorError::not_found("workflow", workflow.id))?;

        tracing::info!(
            workflow_id = updated.id,
            is_active = updated.is_active,
            "Workflow toggled",
        );
        Ok(updated)
    }

    /// Full remote definition of one of the user's workflows, node graph
    /// included. Nothing is stored.
    pub async fn workflow_definition(
        &self,
        user_id: DbId,
        workflow_id: DbId,
    ) -> Result<RemoteWorkflow, MonitorError> {
        let workflow = self.owned_workflow(user_id, workflow_id).await?;
        let instance = self.workflow_instance(&workflow).await?;
        let api = self.connector.connect(&instance)?;
        Ok(api.get_workflow(&workflow.remote_id).await?)
    }

    pub async fn execution(&self, user_id: DbId, execution_id: DbId) -> Result<Execution, MonitorError> {
        self.store
            .find_execution_for_user(execution_id, user_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("execution", execution_id))
    }

    /// Re-fetch one execution from its instance and overwrite the local copy.
    ///
    /// The row already exists, so the failure counter is not touched.
    pub async fn refresh_execution(
        &self,
        user_id: DbId,
        execution_id: DbId,
    ) -> Result<Execution, MonitorError> {
        let existing = self.execution(user_id, execution_id).await?;
        let instance = self
            .store
            .find_instance(existing.instance_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("instance", existing.instance_id))?;
        let _guard = self.locks.acquire(instance.id).await;

        let api = self.connector.connect(&instance)?;
        let remote = api.get_execution(&existing.remote_id).await?;
        let input = to_new_execution(&instance, existing.workflow_id, &remote)?;
        let updated = self.store.update_execution(existing.id, &input).await?;

        tracing::debug!(execution_id = updated.id, status = %updated.status, "Execution refreshed");
        Ok(updated)
    }

    /// Counter of one of the user's workflows, if any execution was ever
    /// processed for it.
    pub async fn error_counter(
        &self,
        user_id: DbId,
        workflow_id: DbId,
    ) -> Result<Option<WorkflowErrorCounter>, MonitorError> {
        let workflow = self.owned_workflow(user_id, workflow_id).await?;
        Ok(self.store.find_error_counter(workflow.id).await?)
    }

    /// Clear the failure streak and the auto-deactivation flag.
    ///
    /// Waits for the instance lock so a running reconciliation cannot write
    /// its older counter back over the reset.
    pub async fn reset_error_counter(
        &self,
        user_id: DbId,
        workflow_id: DbId,
    ) -> Result<WorkflowErrorCounter, MonitorError> {
        let workflow = self.owned_workflow(user_id, workflow_id).await?;
        let _guard = self.locks.acquire(workflow.instance_id).await;
        let state = self
            .store
            .find_error_counter(workflow.id)
            .await?
            .map(|counter| counter.state())
            .unwrap_or_default();

        let counter = self
            .store
            .save_error_counter(workflow.id, &failure_counter::reset(&state))
            .await?;
        tracing::info!(workflow_id = workflow.id, "Error counter reset");
        Ok(counter)
    }

    /// Probe one of the user's instances. The check time is stamped either way.
    pub async fn test_instance(&self, user_id: DbId, instance_id: DbId) -> Result<bool, MonitorError> {
        let instance = self.owned_instance(user_id, instance_id).await?;
        let api = self.connector.connect(&instance)?;
        let connected = api.test_connection().await;
        self.store
            .touch_instance_last_check(instance.id, Utc::now())
            .await?;
        Ok(connected)
    }
}
