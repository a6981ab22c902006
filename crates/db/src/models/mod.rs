pub mod error_counter;
pub mod execution;
pub mod instance;
pub mod notification_log;
pub mod push_subscription;
pub mod user_settings;
pub mod workflow;
