pub mod executions;
pub mod instances;
pub mod monitor;
pub mod notifications;
pub mod push;
pub mod settings;
pub mod workflows;
