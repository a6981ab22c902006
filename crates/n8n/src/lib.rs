//! Client for the n8n public REST API.
//!
//! [`N8nApi`] talks to one instance; [`WorkflowApi`] is the seam the monitor
//! depends on so reconciliation can run against a scripted remote in tests.

pub mod api;
pub mod types;

pub use api::{normalize_base_url, N8nApi, N8nApiError, WorkflowApi, API_KEY_HEADER};
pub use types::{ExecutionPage, ExecutionQuery, RemoteExecution, RemoteTag, RemoteWorkflow};
