//! Repository round trips against a live Postgres.
//!
//! Run with `DATABASE_URL` set: `cargo test -p flowwatch-db -- --ignored`.

use chrono::{Duration, Utc};
use flowwatch_core::alert_policy::AlertKind;
use flowwatch_core::execution::ExecutionStatus;
use flowwatch_core::failure_counter::ErrorCounterState;
use flowwatch_db::models::execution::{ExecutionFilter, NewExecution};
use flowwatch_db::models::instance::CreateInstance;
use flowwatch_db::models::notification_log::{LogPage, NewNotificationLog};
use flowwatch_db::models::user_settings::UpdateUserSettings;
use flowwatch_db::models::workflow::{UpsertWorkflow, WorkflowFilter};
use flowwatch_db::repositories::*;
use sqlx::PgPool;

async fn seed_user(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (email) VALUES ($1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_instance(pool: &PgPool, user_id: i64) -> i64 {
    InstanceRepo::create(
        pool,
        &CreateInstance {
            user_id,
            name: "prod".into(),
            base_url: "https://n8n.example.com".into(),
            api_key_sealed: vec![1, 2, 3],
        },
    )
    .await
    .unwrap()
    .id
}

fn upsert(instance_id: i64, remote_id: &str, name: &str, active: bool) -> UpsertWorkflow {
    UpsertWorkflow {
        instance_id,
        remote_id: remote_id.into(),
        name: name.into(),
        is_active: active,
        synced_at: Utc::now(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn workflow_upsert_keeps_one_row_per_remote_id(pool: PgPool) {
    let user = seed_user(&pool, "a@example.com").await;
    let instance = seed_instance(&pool, user).await;

    let first = WorkflowRepo::upsert(&pool, &upsert(instance, "7", "Old", true))
        .await
        .unwrap();
    let second = WorkflowRepo::upsert(&pool, &upsert(instance, "7", "New", false))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "New");
    assert!(!second.is_active);

    let map = WorkflowRepo::remote_id_map(&pool, instance).await.unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["7"], first.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn last_execution_never_moves_backwards(pool: PgPool) {
    let user = seed_user(&pool, "b@example.com").await;
    let instance = seed_instance(&pool, user).await;
    let wf = WorkflowRepo::upsert(&pool, &upsert(instance, "1", "W", true))
        .await
        .unwrap();

    let later = Utc::now();
    let earlier = later - Duration::hours(1);
    WorkflowRepo::advance_last_execution(&pool, wf.id, later).await.unwrap();
    WorkflowRepo::advance_last_execution(&pool, wf.id, earlier).await.unwrap();

    let wf = WorkflowRepo::find_by_id(&pool, wf.id).await.unwrap().unwrap();
    let stored = wf.last_execution_at.unwrap();
    assert!((stored - later).num_milliseconds().abs() < 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recent_error_filter_uses_latest_execution(pool: PgPool) {
    let user = seed_user(&pool, "c@example.com").await;
    let instance = seed_instance(&pool, user).await;
    let wf = WorkflowRepo::upsert(&pool, &upsert(instance, "1", "W", true))
        .await
        .unwrap();

    let now = Utc::now();
    for (remote_id, status, offset) in [
        ("e1", ExecutionStatus::Success, 2),
        ("e2", ExecutionStatus::Error, 1),
    ] {
        ExecutionRepo::create(
            &pool,
            &NewExecution {
                instance_id: instance,
                workflow_id: Some(wf.id),
                remote_id: remote_id.into(),
                status,
                mode: Some("trigger".into()),
                started_at: Some(now - Duration::minutes(offset)),
                finished_at: None,
                payload: None,
            },
        )
        .await
        .unwrap();
    }

    let filter = WorkflowFilter {
        has_recent_errors: Some(true),
        ..Default::default()
    };
    let rows = WorkflowRepo::list_for_user(&pool, user, &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].last_execution_status.as_deref(), Some("error"));

    let errors = ExecutionRepo::list_for_user(
        &pool,
        user,
        &ExecutionFilter {
            status: Some(ExecutionStatus::Error),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].remote_id, "e2");
}

fn new_execution(instance_id: i64, remote_id: &str) -> NewExecution {
    NewExecution {
        instance_id,
        workflow_id: None,
        remote_id: remote_id.into(),
        status: ExecutionStatus::Success,
        mode: Some("trigger".into()),
        started_at: Some(Utc::now()),
        finished_at: None,
        payload: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn execution_remote_id_is_unique_per_instance(pool: PgPool) {
    let user = seed_user(&pool, "dup@example.com").await;
    let prod = seed_instance(&pool, user).await;
    let staging = seed_instance(&pool, user).await;

    let a = ExecutionRepo::create(&pool, &new_execution(prod, "1")).await.unwrap();
    let b = ExecutionRepo::create(&pool, &new_execution(staging, "1")).await.unwrap();
    assert_ne!(a.id, b.id);

    let found = ExecutionRepo::find_by_remote_id(&pool, staging, "1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, b.id);

    let err = ExecutionRepo::create(&pool, &new_execution(prod, "1"))
        .await
        .unwrap_err();
    let code = err.as_database_error().and_then(|e| e.code()).map(|c| c.into_owned());
    assert_eq!(code.as_deref(), Some("23505"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn error_counter_created_lazily_and_overwritten(pool: PgPool) {
    let user = seed_user(&pool, "d@example.com").await;
    let instance = seed_instance(&pool, user).await;
    let wf = WorkflowRepo::upsert(&pool, &upsert(instance, "1", "W", true))
        .await
        .unwrap();

    assert!(ErrorCounterRepo::find_by_workflow(&pool, wf.id).await.unwrap().is_none());

    let mut state = ErrorCounterState {
        consecutive_errors: 2,
        total_errors: 2,
        last_error_at: Some(Utc::now()),
        ..Default::default()
    };
    let row = ErrorCounterRepo::save(&pool, wf.id, &state).await.unwrap();
    assert_eq!(row.consecutive_errors, 2);

    state.consecutive_errors = 0;
    let row2 = ErrorCounterRepo::save(&pool, wf.id, &state).await.unwrap();
    assert_eq!(row.id, row2.id);
    assert_eq!(row2.total_errors, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn settings_upsert_applies_defaults_then_partial_updates(pool: PgPool) {
    let user = seed_user(&pool, "e@example.com").await;
    assert!(UserSettingsRepo::find_for_user(&pool, user).await.unwrap().is_none());

    let created = UserSettingsRepo::upsert(&pool, user, &UpdateUserSettings::default())
        .await
        .unwrap();
    assert_eq!(created.error_threshold, 1);
    assert_eq!(created.auto_deactivate_threshold, 3);

    let updated = UserSettingsRepo::upsert(
        &pool,
        user,
        &UpdateUserSettings {
            auto_deactivate_workflow: Some(true),
            notification_email: Some("ops@example.com".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(updated.auto_deactivate_workflow);
    assert!(updated.notify_on_error);
    assert_eq!(updated.notification_email.as_deref(), Some("ops@example.com"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn notification_log_append_and_page(pool: PgPool) {
    let user = seed_user(&pool, "f@example.com").await;
    let log = NotificationLogRepo::append(
        &pool,
        &NewNotificationLog {
            user_id: user,
            workflow_id: None,
            instance_id: None,
            execution_id: None,
            kind: AlertKind::Warning,
            title: "Workflow deactivated".into(),
            message: "W was deactivated".into(),
            metadata: serde_json::json!({}),
            sent: true,
        },
    )
    .await
    .unwrap();
    assert_eq!(log.kind, "warning");
    assert!(log.sent_at.is_some());

    let page = NotificationLogRepo::list_for_user(&pool, user, LogPage::default())
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_instance_cascades(pool: PgPool) {
    let user = seed_user(&pool, "g@example.com").await;
    let other = seed_user(&pool, "h@example.com").await;
    let instance = seed_instance(&pool, user).await;
    WorkflowRepo::upsert(&pool, &upsert(instance, "1", "W", true))
        .await
        .unwrap();

    assert!(!InstanceRepo::delete_for_user(&pool, instance, other).await.unwrap());
    assert!(InstanceRepo::delete_for_user(&pool, instance, user).await.unwrap());

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflows")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
}
