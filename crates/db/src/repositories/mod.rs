//! Zero-sized repository structs, one per table, taking `&PgPool`.

pub mod error_counter_repo;
pub mod execution_repo;
pub mod instance_repo;
pub mod notification_log_repo;
pub mod push_subscription_repo;
pub mod user_repo;
pub mod user_settings_repo;
pub mod workflow_repo;

pub use error_counter_repo::ErrorCounterRepo;
pub use execution_repo::ExecutionRepo;
pub use instance_repo::InstanceRepo;
pub use notification_log_repo::NotificationLogRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use user_repo::UserRepo;
pub use user_settings_repo::UserSettingsRepo;
pub use workflow_repo::WorkflowRepo;
