use std::collections::HashMap;

use async_trait::async_trait;
use flowwatch_core::failure_counter::ErrorCounterState;
use flowwatch_core::types::{DbId, Timestamp};
use flowwatch_db::models::error_counter::WorkflowErrorCounter;
use flowwatch_db::models::execution::{Execution, ExecutionFilter, NewExecution};
use flowwatch_db::models::instance::{CreateInstance, Instance};
use flowwatch_db::models::notification_log::{LogPage, NewNotificationLog, NotificationLog};
use flowwatch_db::models::push_subscription::{PushSubscription, UpsertPushSubscription};
use flowwatch_db::models::user_settings::{UpdateUserSettings, UserSettings};
use flowwatch_db::models::workflow::{UpsertWorkflow, Workflow, WorkflowFilter, WorkflowSummary};
use flowwatch_db::repositories::{
    ErrorCounterRepo, ExecutionRepo, InstanceRepo, NotificationLogRepo, PushSubscriptionRepo,
    UserRepo, UserSettingsRepo, WorkflowRepo,
};
use flowwatch_db::DbPool;

use super::{MonitorStore, StoreResult};

/// [`MonitorStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl MonitorStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(flowwatch_db::health_check(&self.pool).await?)
    }

    async fn find_user_email(&self, user_id: DbId) -> StoreResult<Option<String>> {
        Ok(UserRepo::find_email(&self.pool, user_id).await?)
    }

    // ── Instances ────────────────────────────────────────────────────

    async fn list_active_instances(&self) -> StoreResult<Vec<Instance>> {
        Ok(InstanceRepo::list_active(&self.pool).await?)
    }

    async fn list_instances_for_user(&self, user_id: DbId) -> StoreResult<Vec<Instance>> {
        Ok(InstanceRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn find_instance(&self, id: DbId) -> StoreResult<Option<Instance>> {
        Ok(InstanceRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_instance_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Instance>> {
        Ok(InstanceRepo::find_for_user(&self.pool, id, user_id).await?)
    }

    async fn create_instance(&self, input: &CreateInstance) -> StoreResult<Instance> {
        Ok(InstanceRepo::create(&self.pool, input).await?)
    }

    async fn delete_instance_for_user(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(InstanceRepo::delete_for_user(&self.pool, id, user_id).await?)
    }

    async fn touch_instance_last_check(&self, id: DbId, at: Timestamp) -> StoreResult<()> {
        Ok(InstanceRepo::touch_last_check(&self.pool, id, at).await?)
    }

    // ── Workflows ────────────────────────────────────────────────────

    async fn find_workflow(&self, id: DbId) -> StoreResult<Option<Workflow>> {
        Ok(WorkflowRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_workflow_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Workflow>> {
        Ok(WorkflowRepo::find_for_user(&self.pool, id, user_id).await?)
    }

    async fn workflow_remote_map(&self, instance_id: DbId) -> StoreResult<HashMap<String, DbId>> {
        Ok(WorkflowRepo::remote_id_map(&self.pool, instance_id).await?)
    }

    async fn list_workflows(
        &self,
        user_id: DbId,
        filter: &WorkflowFilter,
    ) -> StoreResult<Vec<WorkflowSummary>> {
        Ok(WorkflowRepo::list_for_user(&self.pool, user_id, filter).await?)
    }

    async fn upsert_workflow(&self, input: &UpsertWorkflow) -> StoreResult<Workflow> {
        Ok(WorkflowRepo::upsert(&self.pool, input).await?)
    }

    async fn set_workflow_active(
        &self,
        id: DbId,
        is_active: bool,
        synced_at: Timestamp,
    ) -> StoreResult<Option<Workflow>> {
        Ok(WorkflowRepo::set_active(&self.pool, id, is_active, synced_at).await?)
    }

    async fn advance_workflow_last_execution(&self, id: DbId, at: Timestamp) -> StoreResult<()> {
        Ok(WorkflowRepo::advance_last_execution(&self.pool, id, at).await?)
    }

    // ── Executions ───────────────────────────────────────────────────

    async fn find_execution(
        &self,
        instance_id: DbId,
        remote_id: &str,
    ) -> StoreResult<Option<Execution>> {
        Ok(ExecutionRepo::find_by_remote_id(&self.pool, instance_id, remote_id).await?)
    }

    async fn find_execution_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Execution>> {
        Ok(ExecutionRepo::find_for_user(&self.pool, id, user_id).await?)
    }

    async fn list_executions(
        &self,
        user_id: DbId,
        filter: &ExecutionFilter,
    ) -> StoreResult<Vec<Execution>> {
        Ok(ExecutionRepo::list_for_user(&self.pool, user_id, filter).await?)
    }

    async fn create_execution(&self, input: &NewExecution) -> StoreResult<Execution> {
        Ok(ExecutionRepo::create(&self.pool, input).await?)
    }

    async fn update_execution(&self, id: DbId, input: &NewExecution) -> StoreResult<Execution> {
        Ok(ExecutionRepo::update(&self.pool, id, input).await?)
    }

    // ── Error counters ───────────────────────────────────────────────

    async fn find_error_counter(
        &self,
        workflow_id: DbId,
    ) -> StoreResult<Option<WorkflowErrorCounter>> {
        Ok(ErrorCounterRepo::find_by_workflow(&self.pool, workflow_id).await?)
    }

    async fn save_error_counter(
        &self,
        workflow_id: DbId,
        state: &ErrorCounterState,
    ) -> StoreResult<WorkflowErrorCounter> {
        Ok(ErrorCounterRepo::save(&self.pool, workflow_id, state).await?)
    }

    // ── Settings ─────────────────────────────────────────────────────

    async fn find_user_settings(&self, user_id: DbId) -> StoreResult<Option<UserSettings>> {
        Ok(UserSettingsRepo::find_for_user(&self.pool, user_id).await?)
    }

    async fn upsert_user_settings(
        &self,
        user_id: DbId,
        input: &UpdateUserSettings,
    ) -> StoreResult<UserSettings> {
        Ok(UserSettingsRepo::upsert(&self.pool, user_id, input).await?)
    }

    // ── Notification log ─────────────────────────────────────────────

    async fn append_notification_log(
        &self,
        input: &NewNotificationLog,
    ) -> StoreResult<NotificationLog> {
        Ok(NotificationLogRepo::append(&self.pool, input).await?)
    }

    async fn list_notification_logs(
        &self,
        user_id: DbId,
        page: LogPage,
    ) -> StoreResult<Vec<NotificationLog>> {
        Ok(NotificationLogRepo::list_for_user(&self.pool, user_id, page).await?)
    }

    // ── Push subscriptions ───────────────────────────────────────────

    async fn upsert_push_subscription(
        &self,
        user_id: DbId,
        input: &UpsertPushSubscription,
    ) -> StoreResult<PushSubscription> {
        Ok(PushSubscriptionRepo::upsert(&self.pool, user_id, input).await?)
    }

    async fn remove_push_subscription(&self, user_id: DbId, endpoint: &str) -> StoreResult<bool> {
        Ok(PushSubscriptionRepo::remove_for_user(&self.pool, user_id, endpoint).await?)
    }
}
