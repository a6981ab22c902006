//! Mirrors remote workflows and executions into local storage.
//!
//! Every remote call happens before the first write, so a failed fetch leaves
//! storage untouched. Writes are per row and not transactional: an error in
//! the middle of a batch keeps the rows already written.

use std::sync::Arc;

use chrono::Utc;
use flowwatch_core::error::CoreError;
use flowwatch_core::execution::DEFAULT_SYNC_LIMIT;
use flowwatch_core::types::DbId;
use flowwatch_db::models::execution::{Execution, NewExecution};
use flowwatch_db::models::instance::Instance;
use flowwatch_db::models::workflow::UpsertWorkflow;
use flowwatch_n8n::{ExecutionQuery, RemoteExecution, WorkflowApi};
use serde::Serialize;

use crate::error::MonitorError;
use crate::store::MonitorStore;

/// Parameters of one execution sync.
#[derive(Debug, Clone)]
pub struct ExecutionSyncRequest {
    /// Executions to fetch, already validated.
    pub limit: i64,
    /// Restrict the fetch to one remote workflow.
    pub workflow_remote_id: Option<String>,
}

impl Default for ExecutionSyncRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SYNC_LIMIT,
            workflow_remote_id: None,
        }
    }
}

/// Outcome of a workflow sync.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WorkflowSyncReport {
    /// Workflows upserted.
    pub synced: usize,
}

/// Outcome of an execution sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionSyncReport {
    pub created: usize,
    pub updated: usize,
    /// Executions returned by the remote.
    pub total: usize,
    /// Rows created by this call, in the order the remote returned them.
    #[serde(skip)]
    pub new_executions: Vec<Execution>,
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn MonitorStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn MonitorStore>) -> Self {
        Self { store }
    }

    /// Upsert every remote workflow of `instance`.
    ///
    /// Local workflows missing from the remote list are kept.
    pub async fn sync_workflows(
        &self,
        instance: &Instance,
        api: &dyn WorkflowApi,
    ) -> Result<WorkflowSyncReport, MonitorError> {
        let remote = api.list_workflows().await?;
        let now = Utc::now();

        for workflow in &remote {
            self.store
                .upsert_workflow(&UpsertWorkflow {
                    instance_id: instance.id,
                    remote_id: workflow.id.clone(),
                    name: workflow.name.clone(),
                    is_active: workflow.active,
                    synced_at: now,
                })
                .await?;
        }

        tracing::debug!(instance_id = instance.id, synced = remote.len(), "Workflows synced");
        Ok(WorkflowSyncReport {
            synced: remote.len(),
        })
    }

    /// Upsert the most recent executions of `instance`.
    pub async fn sync_executions(
        &self,
        instance: &Instance,
        api: &dyn WorkflowApi,
        request: &ExecutionSyncRequest,
    ) -> Result<ExecutionSyncReport, MonitorError> {
        let page = api
            .list_executions(&ExecutionQuery {
                workflow_id: request.workflow_remote_id.clone(),
                limit: request.limit,
                include_data: true,
                ..Default::default()
            })
            .await?;

        let workflow_ids = self.store.workflow_remote_map(instance.id).await?;
        let mut report = ExecutionSyncReport {
            total: page.data.len(),
            ..Default::default()
        };

        for remote in &page.data {
            let workflow_id = remote
                .workflow_id
                .as_ref()
                .and_then(|id| workflow_ids.get(id).copied());
            let input = to_new_execution(instance, workflow_id, remote)?;

            match self.store.find_execution(instance.id, &remote.id).await? {
                Some(existing) => {
                    self.store.update_execution(existing.id, &input).await?;
                    report.updated += 1;
                }
                None => {
                    let created = self.store.create_execution(&input).await?;
                    report.new_executions.push(created);
                    report.created += 1;
                }
            }

            if let (Some(workflow_id), Some(at)) =
                (workflow_id, input.finished_at.or(input.started_at))
            {
                self.store
                    .advance_workflow_last_execution(workflow_id, at)
                    .await?;
            }
        }

        tracing::debug!(
            instance_id = instance.id,
            created = report.created,
            updated = report.updated,
            total = report.total,
            "Executions synced",
        );
        Ok(report)
    }
}

pub(crate) fn to_new_execution(
    instance: &Instance,
    workflow_id: Option<DbId>,
    remote: &RemoteExecution,
) -> Result<NewExecution, MonitorError> {
    let payload = serde_json::to_value(remote)
        .map_err(|e| CoreError::Internal(format!("failed to encode execution payload: {e}")))?;
    Ok(NewExecution {
        instance_id: instance.id,
        workflow_id,
        remote_id: remote.id.clone(),
        status: remote.normalized_status(),
        mode: remote.mode.clone(),
        started_at: remote.started_at,
        finished_at: remote.stopped_at,
        payload: Some(payload),
    })
}
