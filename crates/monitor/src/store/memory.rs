//! In-process [`MonitorStore`] with the same semantics as the Postgres
//! schema: unique keys, cascading deletes and partial settings updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use flowwatch_core::alert_policy::AlertPolicy;
use flowwatch_core::failure_counter::ErrorCounterState;
use flowwatch_core::types::{DbId, Timestamp};
use flowwatch_db::models::error_counter::WorkflowErrorCounter;
use flowwatch_db::models::execution::{Execution, ExecutionFilter, NewExecution};
use flowwatch_db::models::instance::{CreateInstance, Instance};
use flowwatch_db::models::notification_log::{LogPage, NewNotificationLog, NotificationLog};
use flowwatch_db::models::push_subscription::{PushSubscription, UpsertPushSubscription};
use flowwatch_db::models::user_settings::{UpdateUserSettings, UserSettings};
use flowwatch_db::models::workflow::{UpsertWorkflow, Workflow, WorkflowFilter, WorkflowSummary};
use flowwatch_events::{BoxError, SubscriptionStore};

use super::{MonitorStore, StoreResult};
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    next_id: DbId,
    users: HashMap<DbId, String>,
    instances: Vec<Instance>,
    workflows: Vec<Workflow>,
    executions: Vec<Execution>,
    counters: Vec<WorkflowErrorCounter>,
    settings: Vec<UserSettings>,
    logs: Vec<NotificationLog>,
    subscriptions: Vec<PushSubscription>,
    user_email_lookups: usize,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn instance_owner(&self, instance_id: DbId) -> Option<DbId> {
        self.instances
            .iter()
            .find(|i| i.id == instance_id)
            .map(|i| i.user_id)
    }

    fn last_execution_status(&self, workflow_id: DbId) -> Option<String> {
        self.executions
            .iter()
            .filter(|e| e.workflow_id == Some(workflow_id))
            .max_by_key(|e| (e.started_at.is_some(), e.started_at, e.id))
            .map(|e| e.status.clone())
    }
}

/// Shared in-memory store. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a user account and return its id.
    pub fn add_user(&self, email: &str) -> DbId {
        let mut tables = self.lock();
        let id = tables.next_id();
        tables.users.insert(id, email.to_string());
        id
    }

    /// How many times an account email has been looked up.
    pub fn user_email_lookups(&self) -> usize {
        self.lock().user_email_lookups
    }

    /// Every subscription row of a user, active or not.
    pub fn push_subscriptions(&self, user_id: DbId) -> Vec<PushSubscription> {
        self.lock()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every log entry of a user, oldest first.
    pub fn notification_logs(&self, user_id: DbId) -> Vec<NotificationLog> {
        self.lock()
            .logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_email(&self, user_id: DbId) -> StoreResult<Option<String>> {
        let mut tables = self.lock();
        tables.user_email_lookups += 1;
        Ok(tables.users.get(&user_id).cloned())
    }

    // ---- Instances ----

    async fn list_active_instances(&self) -> StoreResult<Vec<Instance>> {
        Ok(self
            .lock()
            .instances
            .iter()
            .filter(|i| i.is_active)
            .cloned()
            .collect())
    }

    async fn list_instances_for_user(&self, user_id: DbId) -> StoreResult<Vec<Instance>> {
        let mut rows: Vec<Instance> = self
            .lock()
            .instances
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn find_instance(&self, id: DbId) -> StoreResult<Option<Instance>> {
        Ok(self.lock().instances.iter().find(|i| i.id == id).cloned())
    }

    async fn find_instance_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Instance>> {
        Ok(self
            .lock()
            .instances
            .iter()
            .find(|i| i.id == id && i.user_id == user_id)
            .cloned())
    }

    async fn create_instance(&self, input: &CreateInstance) -> StoreResult<Instance> {
        let mut tables = self.lock();
        if !tables.users.contains_key(&input.user_id) {
            return Err(StoreError::Backend(format!(
                "user {} does not exist",
                input.user_id
            )));
        }
        let now = Utc::now();
        let instance = Instance {
            id: tables.next_id(),
            user_id: input.user_id,
            name: input.name.clone(),
            base_url: input.base_url.clone(),
            api_key_sealed: input.api_key_sealed.clone(),
            is_active: true,
            last_check_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.instances.push(instance.clone());
        Ok(instance)
    }

    async fn delete_instance_for_user(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        let mut tables = self.lock();
        if tables.instance_owner(id) != Some(user_id) {
            return Ok(false);
        }

        let workflow_ids: Vec<DbId> = tables
            .workflows
            .iter()
            .filter(|w| w.instance_id == id)
            .map(|w| w.id)
            .collect();
        let execution_ids: Vec<DbId> = tables
            .executions
            .iter()
            .filter(|e| e.instance_id == id)
            .map(|e| e.id)
            .collect();

        tables.instances.retain(|i| i.id != id);
        tables.workflows.retain(|w| w.instance_id != id);
        tables.executions.retain(|e| e.instance_id != id);
        tables
            .counters
            .retain(|c| !workflow_ids.contains(&c.workflow_id));
        for log in tables.logs.iter_mut() {
            if log.instance_id == Some(id) {
                log.instance_id = None;
            }
            if log.workflow_id.is_some_and(|w| workflow_ids.contains(&w)) {
                log.workflow_id = None;
            }
            if log.execution_id.is_some_and(|e| execution_ids.contains(&e)) {
                log.execution_id = None;
            }
        }
        Ok(true)
    }

    async fn touch_instance_last_check(&self, id: DbId, at: Timestamp) -> StoreResult<()> {
        if let Some(instance) = self.lock().instances.iter_mut().find(|i| i.id == id) {
            instance.last_check_at = Some(at);
            instance.updated_at = Utc::now();
        }
        Ok(())
    }

    // ---- Workflows ----

    async fn find_workflow(&self, id: DbId) -> StoreResult<Option<Workflow>> {
        Ok(self.lock().workflows.iter().find(|w| w.id == id).cloned())
    }

    async fn find_workflow_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Workflow>> {
        let tables = self.lock();
        Ok(tables
            .workflows
            .iter()
            .find(|w| w.id == id && tables.instance_owner(w.instance_id) == Some(user_id))
            .cloned())
    }

    async fn workflow_remote_map(&self, instance_id: DbId) -> StoreResult<HashMap<String, DbId>> {
        Ok(self
            .lock()
            .workflows
            .iter()
            .filter(|w| w.instance_id == instance_id)
            .map(|w| (w.remote_id.clone(), w.id))
            .collect())
    }

    async fn list_workflows(
        &self,
        user_id: DbId,
        filter: &WorkflowFilter,
    ) -> StoreResult<Vec<WorkflowSummary>> {
        let tables = self.lock();
        let mut rows: Vec<WorkflowSummary> = tables
            .workflows
            .iter()
            .filter(|w| filter.instance_id.map_or(true, |id| w.instance_id == id))
            .filter(|w| filter.active.map_or(true, |active| w.is_active == active))
            .filter_map(|w| {
                let instance = tables
                    .instances
                    .iter()
                    .find(|i| i.id == w.instance_id && i.user_id == user_id)?;
                Some(WorkflowSummary {
                    workflow: w.clone(),
                    instance_name: instance.name.clone(),
                    last_execution_status: tables.last_execution_status(w.id),
                })
            })
            .filter(|s| {
                filter.has_recent_errors != Some(true)
                    || s.last_execution_status.as_deref() == Some("error")
            })
            .collect();
        rows.sort_by(|a, b| {
            let (a, b) = (&a.workflow, &b.workflow);
            // Most recently synced first, never-synced last.
            (b.last_sync_at.is_some(), b.last_sync_at)
                .cmp(&(a.last_sync_at.is_some(), a.last_sync_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn upsert_workflow(&self, input: &UpsertWorkflow) -> StoreResult<Workflow> {
        let mut tables = self.lock();
        let now = Utc::now();
        if let Some(existing) = tables
            .workflows
            .iter_mut()
            .find(|w| w.instance_id == input.instance_id && w.remote_id == input.remote_id)
        {
            existing.name = input.name.clone();
            existing.is_active = input.is_active;
            existing.last_sync_at = Some(input.synced_at);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let workflow = Workflow {
            id: tables.next_id(),
            instance_id: input.instance_id,
            remote_id: input.remote_id.clone(),
            name: input.name.clone(),
            is_active: input.is_active,
            last_sync_at: Some(input.synced_at),
            last_execution_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.workflows.push(workflow.clone());
        Ok(workflow)
    }

    async fn set_workflow_active(
        &self,
        id: DbId,
        is_active: bool,
        synced_at: Timestamp,
    ) -> StoreResult<Option<Workflow>> {
        let mut tables = self.lock();
        let Some(workflow) = tables.workflows.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        workflow.is_active = is_active;
        workflow.last_sync_at = Some(synced_at);
        workflow.updated_at = Utc::now();
        Ok(Some(workflow.clone()))
    }

    async fn advance_workflow_last_execution(&self, id: DbId, at: Timestamp) -> StoreResult<()> {
        if let Some(workflow) = self.lock().workflows.iter_mut().find(|w| w.id == id) {
            workflow.last_execution_at = Some(workflow.last_execution_at.map_or(at, |t| t.max(at)));
            workflow.updated_at = Utc::now();
        }
        Ok(())
    }

    // ---- Executions ----

    async fn find_execution(
        &self,
        instance_id: DbId,
        remote_id: &str,
    ) -> StoreResult<Option<Execution>> {
        Ok(self
            .lock()
            .executions
            .iter()
            .find(|e| e.instance_id == instance_id && e.remote_id == remote_id)
            .cloned())
    }

    async fn find_execution_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Execution>> {
        let tables = self.lock();
        Ok(tables
            .executions
            .iter()
            .find(|e| e.id == id && tables.instance_owner(e.instance_id) == Some(user_id))
            .cloned())
    }

    async fn list_executions(
        &self,
        user_id: DbId,
        filter: &ExecutionFilter,
    ) -> StoreResult<Vec<Execution>> {
        let tables = self.lock();
        let mut rows: Vec<Execution> = tables
            .executions
            .iter()
            .filter(|e| tables.instance_owner(e.instance_id) == Some(user_id))
            .filter(|e| filter.instance_id.map_or(true, |id| e.instance_id == id))
            .filter(|e| filter.workflow_id.map_or(true, |id| e.workflow_id == Some(id)))
            .filter(|e| filter.status.map_or(true, |s| e.status == s.as_str()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (b.started_at.is_some(), b.started_at, b.id).cmp(&(
                a.started_at.is_some(),
                a.started_at,
                a.id,
            ))
        });
        rows.truncate(filter.effective_limit() as usize);
        Ok(rows)
    }

    async fn create_execution(&self, input: &NewExecution) -> StoreResult<Execution> {
        let mut tables = self.lock();
        if tables
            .executions
            .iter()
            .any(|e| e.instance_id == input.instance_id && e.remote_id == input.remote_id)
        {
            return Err(StoreError::Backend(format!(
                "execution {} already exists for instance {}",
                input.remote_id, input.instance_id
            )));
        }
        let now = Utc::now();
        let execution = Execution {
            id: tables.next_id(),
            instance_id: input.instance_id,
            workflow_id: input.workflow_id,
            remote_id: input.remote_id.clone(),
            status: input.status.as_str().to_string(),
            mode: input.mode.clone(),
            started_at: input.started_at,
            finished_at: input.finished_at,
            payload: input.payload.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.executions.push(execution.clone());
        Ok(execution)
    }

    async fn update_execution(&self, id: DbId, input: &NewExecution) -> StoreResult<Execution> {
        let mut tables = self.lock();
        let execution = tables
            .executions
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::Backend(format!("execution {id} does not exist")))?;
        execution.workflow_id = input.workflow_id;
        execution.status = input.status.as_str().to_string();
        execution.mode = input.mode.clone();
        execution.started_at = input.started_at;
        execution.finished_at = input.finished_at;
        execution.payload = input.payload.clone();
        execution.updated_at = Utc::now();
        Ok(execution.clone())
    }

    // ---- Error counters ----

    async fn find_error_counter(
        &self,
        workflow_id: DbId,
    ) -> StoreResult<Option<WorkflowErrorCounter>> {
        Ok(self
            .lock()
            .counters
            .iter()
            .find(|c| c.workflow_id == workflow_id)
            .cloned())
    }

    async fn save_error_counter(
        &self,
        workflow_id: DbId,
        state: &ErrorCounterState,
    ) -> StoreResult<WorkflowErrorCounter> {
        let mut tables = self.lock();
        let now = Utc::now();
        if let Some(counter) = tables
            .counters
            .iter_mut()
            .find(|c| c.workflow_id == workflow_id)
        {
            counter.consecutive_errors = state.consecutive_errors;
            counter.total_errors = state.total_errors;
            counter.last_error_at = state.last_error_at;
            counter.last_success_at = state.last_success_at;
            counter.is_auto_deactivated = state.is_auto_deactivated;
            counter.updated_at = now;
            return Ok(counter.clone());
        }

        let counter = WorkflowErrorCounter {
            id: tables.next_id(),
            workflow_id,
            consecutive_errors: state.consecutive_errors,
            total_errors: state.total_errors,
            last_error_at: state.last_error_at,
            last_success_at: state.last_success_at,
            is_auto_deactivated: state.is_auto_deactivated,
            created_at: now,
            updated_at: now,
        };
        tables.counters.push(counter.clone());
        Ok(counter)
    }

    // ---- Settings ----

    async fn find_user_settings(&self, user_id: DbId) -> StoreResult<Option<UserSettings>> {
        Ok(self
            .lock()
            .settings
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn upsert_user_settings(
        &self,
        user_id: DbId,
        input: &UpdateUserSettings,
    ) -> StoreResult<UserSettings> {
        let mut tables = self.lock();
        let now = Utc::now();
        let index = match tables.settings.iter().position(|s| s.user_id == user_id) {
            Some(index) => index,
            None => {
                let defaults = AlertPolicy::default();
                let row = UserSettings {
                    id: tables.next_id(),
                    user_id,
                    notify_on_error: defaults.notify_on_error,
                    error_threshold: defaults.error_threshold,
                    notify_on_success: defaults.notify_on_success,
                    notify_on_warning: defaults.notify_on_warning,
                    auto_deactivate_workflow: defaults.auto_deactivate_workflow,
                    auto_deactivate_threshold: defaults.auto_deactivate_threshold,
                    push_notifications_enabled: defaults.push_notifications_enabled,
                    email_notifications_enabled: defaults.email_notifications_enabled,
                    notification_email: None,
                    created_at: now,
                    updated_at: now,
                };
                tables.settings.push(row);
                tables.settings.len() - 1
            }
        };

        let row = &mut tables.settings[index];
        if let Some(v) = input.notify_on_error {
            row.notify_on_error = v;
        }
        if let Some(v) = input.error_threshold {
            row.error_threshold = v;
        }
        if let Some(v) = input.notify_on_success {
            row.notify_on_success = v;
        }
        if let Some(v) = input.notify_on_warning {
            row.notify_on_warning = v;
        }
        if let Some(v) = input.auto_deactivate_workflow {
            row.auto_deactivate_workflow = v;
        }
        if let Some(v) = input.auto_deactivate_threshold {
            row.auto_deactivate_threshold = v;
        }
        if let Some(v) = input.push_notifications_enabled {
            row.push_notifications_enabled = v;
        }
        if let Some(v) = input.email_notifications_enabled {
            row.email_notifications_enabled = v;
        }
        if let Some(email) = &input.notification_email {
            row.notification_email = (!email.is_empty()).then(|| email.clone());
        }
        row.updated_at = now;
        Ok(row.clone())
    }

    // ---- Notification log ----

    async fn append_notification_log(
        &self,
        input: &NewNotificationLog,
    ) -> StoreResult<NotificationLog> {
        let mut tables = self.lock();
        let now = Utc::now();
        let log = NotificationLog {
            id: tables.next_id(),
            user_id: input.user_id,
            workflow_id: input.workflow_id,
            instance_id: input.instance_id,
            execution_id: input.execution_id,
            kind: input.kind.as_str().to_string(),
            title: input.title.clone(),
            message: input.message.clone(),
            metadata: input.metadata.clone(),
            sent: input.sent,
            sent_at: input.sent.then_some(now),
            created_at: now,
        };
        tables.logs.push(log.clone());
        Ok(log)
    }

    async fn list_notification_logs(
        &self,
        user_id: DbId,
        page: LogPage,
    ) -> StoreResult<Vec<NotificationLog>> {
        let tables = self.lock();
        let mut rows: Vec<NotificationLog> = tables
            .logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    // ---- Push subscriptions ----

    async fn upsert_push_subscription(
        &self,
        user_id: DbId,
        input: &UpsertPushSubscription,
    ) -> StoreResult<PushSubscription> {
        let mut tables = self.lock();
        let now = Utc::now();
        if let Some(existing) = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.endpoint == input.endpoint)
        {
            existing.user_id = user_id;
            existing.p256dh = input.p256dh.clone();
            existing.auth = input.auth.clone();
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let subscription = PushSubscription {
            id: tables.next_id(),
            user_id,
            endpoint: input.endpoint.clone(),
            p256dh: input.p256dh.clone(),
            auth: input.auth.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn remove_push_subscription(&self, user_id: DbId, endpoint: &str) -> StoreResult<bool> {
        let mut tables = self.lock();
        let before = tables.subscriptions.len();
        tables
            .subscriptions
            .retain(|s| !(s.user_id == user_id && s.endpoint == endpoint));
        Ok(tables.subscriptions.len() != before)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn active_subscriptions(&self, user_id: DbId) -> Result<Vec<PushSubscription>, BoxError> {
        Ok(self
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate_subscription(&self, subscription_id: DbId) -> Result<(), BoxError> {
        if let Some(subscription) = self
            .lock()
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
        {
            subscription.is_active = false;
            subscription.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowwatch_core::alert_policy::AlertKind;
    use flowwatch_core::execution::ExecutionStatus;

    #[test]
    fn poisoned_lock_is_recovered() {
        let store = MemoryStore::new();
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _tables = poisoner.lock();
            panic!("poison the store");
        })
        .join();
        assert!(store.tables.is_poisoned());

        let user = store.add_user("after@example.com");
        assert_eq!(store.lock().users[&user], "after@example.com");
    }

    async fn seeded() -> (MemoryStore, DbId, Instance) {
        let store = MemoryStore::new();
        let user = store.add_user("owner@example.com");
        let instance = store
            .create_instance(&CreateInstance {
                user_id: user,
                name: "prod".into(),
                base_url: "https://n8n.example.com".into(),
                api_key_sealed: vec![1, 2, 3],
            })
            .await
            .unwrap();
        (store, user, instance)
    }

    fn workflow_input(instance_id: DbId, remote_id: &str, active: bool) -> UpsertWorkflow {
        UpsertWorkflow {
            instance_id,
            remote_id: remote_id.into(),
            name: format!("Workflow {remote_id}"),
            is_active: active,
            synced_at: Utc::now(),
        }
    }

    fn execution_input(instance_id: DbId, workflow_id: DbId, remote_id: &str) -> NewExecution {
        NewExecution {
            instance_id,
            workflow_id: Some(workflow_id),
            remote_id: remote_id.into(),
            status: ExecutionStatus::Error,
            mode: None,
            started_at: Some(Utc::now()),
            finished_at: None,
            payload: None,
        }
    }

    #[tokio::test]
    async fn upsert_workflow_is_keyed_by_remote_id() {
        let (store, _, instance) = seeded().await;
        let first = store
            .upsert_workflow(&workflow_input(instance.id, "a", true))
            .await
            .unwrap();
        let second = store
            .upsert_workflow(&workflow_input(instance.id, "a", false))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(!second.is_active);
        assert_eq!(store.workflow_remote_map(instance.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_execution_is_rejected() {
        let (store, _, instance) = seeded().await;
        let wf = store
            .upsert_workflow(&workflow_input(instance.id, "a", true))
            .await
            .unwrap();
        store
            .create_execution(&execution_input(instance.id, wf.id, "1"))
            .await
            .unwrap();
        assert!(store
            .create_execution(&execution_input(instance.id, wf.id, "1"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn recent_errors_filter_uses_latest_execution() {
        let (store, user, instance) = seeded().await;
        let failing = store
            .upsert_workflow(&workflow_input(instance.id, "a", true))
            .await
            .unwrap();
        let healthy = store
            .upsert_workflow(&workflow_input(instance.id, "b", true))
            .await
            .unwrap();
        store
            .create_execution(&execution_input(instance.id, failing.id, "1"))
            .await
            .unwrap();
        let mut ok = execution_input(instance.id, healthy.id, "2");
        ok.status = ExecutionStatus::Success;
        store.create_execution(&ok).await.unwrap();

        let filter = WorkflowFilter {
            has_recent_errors: Some(true),
            ..Default::default()
        };
        let rows = store.list_workflows(user, &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].workflow.id, failing.id);
        assert_eq!(rows[0].instance_name, "prod");
    }

    #[tokio::test]
    async fn other_users_see_nothing() {
        let (store, _, instance) = seeded().await;
        let stranger = store.add_user("stranger@example.com");
        let wf = store
            .upsert_workflow(&workflow_input(instance.id, "a", true))
            .await
            .unwrap();
        assert!(store
            .find_workflow_for_user(wf.id, stranger)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .list_workflows(stranger, &WorkflowFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(!store
            .delete_instance_for_user(instance.id, stranger)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_instance_cascades_and_keeps_logs() {
        let (store, user, instance) = seeded().await;
        let wf = store
            .upsert_workflow(&workflow_input(instance.id, "a", true))
            .await
            .unwrap();
        let exec = store
            .create_execution(&execution_input(instance.id, wf.id, "1"))
            .await
            .unwrap();
        store
            .save_error_counter(wf.id, &ErrorCounterState::default())
            .await
            .unwrap();
        store
            .append_notification_log(&NewNotificationLog {
                user_id: user,
                workflow_id: Some(wf.id),
                instance_id: Some(instance.id),
                execution_id: Some(exec.id),
                kind: AlertKind::Error,
                title: "t".into(),
                message: "m".into(),
                metadata: serde_json::Value::Null,
                sent: false,
            })
            .await
            .unwrap();

        assert!(store.delete_instance_for_user(instance.id, user).await.unwrap());
        assert!(store.find_workflow(wf.id).await.unwrap().is_none());
        assert!(store.find_error_counter(wf.id).await.unwrap().is_none());

        let logs = store.notification_logs(user);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].workflow_id, None);
        assert_eq!(logs[0].execution_id, None);
    }

    #[tokio::test]
    async fn settings_update_is_partial_and_empty_email_clears() {
        let (store, user, _) = seeded().await;
        let first = store
            .upsert_user_settings(
                user,
                &UpdateUserSettings {
                    error_threshold: Some(4),
                    notification_email: Some("alerts@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.error_threshold, 4);
        assert!(first.email_notifications_enabled);

        let second = store
            .upsert_user_settings(
                user,
                &UpdateUserSettings {
                    push_notifications_enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.error_threshold, 4);
        assert_eq!(second.notification_email.as_deref(), Some("alerts@example.com"));

        let cleared = store
            .upsert_user_settings(
                user,
                &UpdateUserSettings {
                    notification_email: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.notification_email, None);
    }

    #[tokio::test]
    async fn resubscribing_reactivates_endpoint() {
        let (store, user, _) = seeded().await;
        let input = UpsertPushSubscription {
            endpoint: "https://push.example.com/abc".into(),
            p256dh: "p".into(),
            auth: "a".into(),
        };
        let sub = store.upsert_push_subscription(user, &input).await.unwrap();
        store.deactivate_subscription(sub.id).await.unwrap();
        assert!(store.active_subscriptions(user).await.unwrap().is_empty());

        let again = store.upsert_push_subscription(user, &input).await.unwrap();
        assert_eq!(again.id, sub.id);
        assert!(again.is_active);
        assert!(store
            .remove_push_subscription(user, &input.endpoint)
            .await
            .unwrap());
        assert!(store.push_subscriptions(user).is_empty());
    }
}
