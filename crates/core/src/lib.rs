pub mod alert_policy;
pub mod credentials;
pub mod error;
pub mod execution;
pub mod failure_counter;
pub mod types;
