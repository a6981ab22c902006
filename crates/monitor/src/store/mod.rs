//! Storage seam for everything the monitor and the HTTP layer persist.
//!
//! [`postgres::PgStore`] delegates to the repositories in `flowwatch-db`;
//! [`memory::MemoryStore`] keeps the same data in process for tests and
//! local runs without a database.

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

use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // ---- Users ----

    /// Account email of a user, used as the fallback alert address.
    async fn find_user_email(&self, user_id: DbId) -> StoreResult<Option<String>>;

    // ---- Instances ----

    /// Every instance with monitoring enabled, across all users.
    async fn list_active_instances(&self) -> StoreResult<Vec<Instance>>;
    async fn list_instances_for_user(&self, user_id: DbId) -> StoreResult<Vec<Instance>>;
    async fn find_instance(&self, id: DbId) -> StoreResult<Option<Instance>>;
    async fn find_instance_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Instance>>;
    async fn create_instance(&self, input: &CreateInstance) -> StoreResult<Instance>;
    /// Remove an instance and everything mirrored from it.
    async fn delete_instance_for_user(&self, id: DbId, user_id: DbId) -> StoreResult<bool>;
    async fn touch_instance_last_check(&self, id: DbId, at: Timestamp) -> StoreResult<()>;

    // ---- Workflows ----

    async fn find_workflow(&self, id: DbId) -> StoreResult<Option<Workflow>>;
    async fn find_workflow_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Workflow>>;
    /// Remote id to local id for every workflow mirrored from an instance.
    async fn workflow_remote_map(&self, instance_id: DbId) -> StoreResult<HashMap<String, DbId>>;
    async fn list_workflows(
        &self,
        user_id: DbId,
        filter: &WorkflowFilter,
    ) -> StoreResult<Vec<WorkflowSummary>>;
    async fn upsert_workflow(&self, input: &UpsertWorkflow) -> StoreResult<Workflow>;
    async fn set_workflow_active(
        &self,
        id: DbId,
        is_active: bool,
        synced_at: Timestamp,
    ) -> StoreResult<Option<Workflow>>;
    /// Move `last_execution_at` forward. Never moves it backwards.
    async fn advance_workflow_last_execution(&self, id: DbId, at: Timestamp) -> StoreResult<()>;

    // ---- Executions ----

    async fn find_execution(
        &self,
        instance_id: DbId,
        remote_id: &str,
    ) -> StoreResult<Option<Execution>>;
    async fn find_execution_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<Execution>>;
    async fn list_executions(
        &self,
        user_id: DbId,
        filter: &ExecutionFilter,
    ) -> StoreResult<Vec<Execution>>;
    async fn create_execution(&self, input: &NewExecution) -> StoreResult<Execution>;
    async fn update_execution(&self, id: DbId, input: &NewExecution) -> StoreResult<Execution>;

    // ---- Error counters ----

    async fn find_error_counter(&self, workflow_id: DbId)
        -> StoreResult<Option<WorkflowErrorCounter>>;
    async fn save_error_counter(
        &self,
        workflow_id: DbId,
        state: &ErrorCounterState,
    ) -> StoreResult<WorkflowErrorCounter>;

    // ---- Settings ----

    async fn find_user_settings(&self, user_id: DbId) -> StoreResult<Option<UserSettings>>;
    async fn upsert_user_settings(
        &self,
        user_id: DbId,
        input: &UpdateUserSettings,
    ) -> StoreResult<UserSettings>;

    // ---- Notification log ----

    async fn append_notification_log(
        &self,
        input: &NewNotificationLog,
    ) -> StoreResult<NotificationLog>;
    async fn list_notification_logs(
        &self,
        user_id: DbId,
        page: LogPage,
    ) -> StoreResult<Vec<NotificationLog>>;

    // ---- Push subscriptions ----

    async fn upsert_push_subscription(
        &self,
        user_id: DbId,
        input: &UpsertPushSubscription,
    ) -> StoreResult<PushSubscription>;
    async fn remove_push_subscription(&self, user_id: DbId, endpoint: &str) -> StoreResult<bool>;
}
