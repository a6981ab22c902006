//! REST client for a single n8n instance.
//!
//! Every request carries the instance API key in the [`API_KEY_HEADER`]
//! header. The client holds no other state, so one value is built per call
//! site from the instance's base URL and decrypted key.

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use crate::types::{
    ExecutionPage, ExecutionQuery, ItemEnvelope, ListEnvelope, PageEnvelope, RemoteExecution,
    RemoteWorkflow,
};

/// Header n8n reads the API key from.
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Errors from the n8n REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum N8nApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// n8n returned a non-2xx status code.
    #[error("n8n API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The body was not the JSON shape we expected.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Operations the monitor needs from a remote instance.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflow>, N8nApiError>;

    /// Full workflow definition including nodes, connections and tags.
    async fn get_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError>;

    async fn list_executions(&self, query: &ExecutionQuery)
        -> Result<ExecutionPage, N8nApiError>;

    async fn get_execution(&self, remote_id: &str) -> Result<RemoteExecution, N8nApiError>;

    /// Activate a workflow. Succeeds if it is already active.
    async fn activate_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError>;

    /// Deactivate a workflow. Succeeds if it is already inactive.
    async fn deactivate_workflow(&self, remote_id: &str)
        -> Result<RemoteWorkflow, N8nApiError>;

    /// Probe reachability and credential validity. Never errors.
    async fn test_connection(&self) -> bool;
}

/// Reduce a user-supplied instance URL to its root.
///
/// Whitespace and trailing slashes are dropped, as is a trailing `/api` or
/// `/api/v1`, since every request path already carries `/api/v1`.
pub fn normalize_base_url(raw: &str) -> String {
    let mut url = raw.trim().trim_end_matches('/');
    for suffix in ["/api/v1", "/api"] {
        if let Some(stripped) = url.strip_suffix(suffix) {
            url = stripped.trim_end_matches('/');
            break;
        }
    }
    url.to_string()
}

/// HTTP client for a single n8n instance.
#[derive(Clone)]
pub struct N8nApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for N8nApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("N8nApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl N8nApi {
    /// Create a client with its own connection pool.
    ///
    /// * `base_url` - Instance root, e.g. `https://n8n.example.com`. A
    ///   trailing slash is stripped.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (connection pooling across instances; the shared client carries no
    /// credential).
    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
    }

    /// Shared body of activate/deactivate.
    ///
    /// n8n answers 400 or 409 when the workflow is already in the requested
    /// state; in that case the current definition is fetched and returned if
    /// it confirms the state.
    async fn set_active(
        &self,
        remote_id: &str,
        active: bool,
    ) -> Result<RemoteWorkflow, N8nApiError> {
        let action = if active { "activate" } else { "deactivate" };
        let response = self
            .post(&format!("/api/v1/workflows/{remote_id}/{action}"))
            .send()
            .await?;

        match Self::parse_response::<ItemEnvelope<RemoteWorkflow>>(response).await {
            Ok(workflow) => Ok(workflow.into_inner()),
            Err(err @ N8nApiError::Api { status: 400 | 409, .. }) => {
                let current = self.get_workflow(remote_id).await?;
                if current.active == active {
                    tracing::debug!(
                        base_url = %self.base_url,
                        remote_id,
                        action,
                        "Workflow already in requested state",
                    );
                    Ok(current)
                } else {
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`N8nApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, N8nApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(N8nApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, N8nApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl WorkflowApi for N8nApi {
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflow>, N8nApiError> {
        let response = self.get("/api/v1/workflows").send().await?;
        let envelope: ListEnvelope<RemoteWorkflow> = Self::parse_response(response).await?;
        Ok(envelope.into_inner())
    }

    async fn get_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError> {
        let response = self
            .get(&format!("/api/v1/workflows/{remote_id}"))
            .send()
            .await?;
        let envelope: ItemEnvelope<RemoteWorkflow> = Self::parse_response(response).await?;
        Ok(envelope.into_inner())
    }

    async fn list_executions(
        &self,
        query: &ExecutionQuery,
    ) -> Result<ExecutionPage, N8nApiError> {
        let response = self
            .get("/api/v1/executions")
            .query(&query.to_params())
            .send()
            .await?;
        let envelope: PageEnvelope = Self::parse_response(response).await?;
        Ok(envelope.into())
    }

    async fn get_execution(&self, remote_id: &str) -> Result<RemoteExecution, N8nApiError> {
        let response = self
            .get(&format!("/api/v1/executions/{remote_id}"))
            .query(&[("includeData", "true")])
            .send()
            .await?;
        let envelope: ItemEnvelope<RemoteExecution> = Self::parse_response(response).await?;
        Ok(envelope.into_inner())
    }

    async fn activate_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError> {
        self.set_active(remote_id, true).await
    }

    async fn deactivate_workflow(
        &self,
        remote_id: &str,
    ) -> Result<RemoteWorkflow, N8nApiError> {
        self.set_active(remote_id, false).await
    }

    async fn test_connection(&self) -> bool {
        let result = match self.get("/api/v1/users").query(&[("limit", "1")]).send().await {
            Ok(response) => Self::ensure_success(response).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(base_url = %self.base_url, error = %e, "Connection test failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let api = N8nApi::new("https://n8n.example.com/", "key");
        assert_eq!(api.base_url(), "https://n8n.example.com");
    }

    #[test]
    fn base_url_normalization() {
        assert_eq!(normalize_base_url(" https://n8n.example.com/ "), "https://n8n.example.com");
        assert_eq!(normalize_base_url("https://n8n.example.com/api/v1/"), "https://n8n.example.com");
        assert_eq!(normalize_base_url("https://n8n.example.com/api"), "https://n8n.example.com");
        assert_eq!(
            normalize_base_url("https://example.com/n8n/api/v1"),
            "https://example.com/n8n"
        );
        assert_eq!(normalize_base_url("https://example.com/apis"), "https://example.com/apis");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let api = N8nApi::new("http://localhost:5678", "super-secret");
        let rendered = format!("{api:?}");
        assert!(rendered.contains("localhost:5678"));
        assert!(!rendered.contains("super-secret"));
    }

    #[tokio::test]
    async fn unreachable_instance_reports_false() {
        let api = N8nApi::new("http://127.0.0.1:1", "key");
        assert!(!api.test_connection().await);
    }
}
