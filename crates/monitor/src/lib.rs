//! Background monitoring of remote n8n instances.
//!
//! A monitoring pass walks every active instance, mirrors its workflows and
//! recent executions into local storage, and feeds each newly observed
//! execution through the failure counter. Threshold crossings turn into
//! alerts and, when the owner asked for it, automatic deactivation of the
//! failing workflow on the instance.
//!
//! The same reconciliation runs on demand when a user triggers a sync.

pub mod alerting;
pub mod config;
pub mod connector;
pub mod error;
pub mod locks;
pub mod reconcile;
pub mod service;
pub mod store;

pub use alerting::{FailureMonitor, ProcessOutcome};
pub use config::MonitorConfig;
pub use connector::{N8nConnector, RemoteConnector};
pub use error::{MonitorError, StoreError};
pub use locks::InstanceLocks;
pub use reconcile::{ExecutionSyncReport, ExecutionSyncRequest, Reconciler, WorkflowSyncReport};
pub use service::{MonitorService, PassReport};
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::MonitorStore;
