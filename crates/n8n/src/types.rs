//! Wire types for the n8n REST API.
//!
//! Different n8n releases wrap responses differently (`{ "data": [...] }` or a
//! bare array) and serialize IDs as strings or numbers. Both variations are
//! normalized here so callers only ever see one shape.

use chrono::{DateTime, Utc};
use flowwatch_core::execution::{derive_status, ExecutionStatus, DEFAULT_SYNC_LIMIT};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// A workflow as returned by `GET /api/v1/workflows[/{id}]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorkflow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<serde_json::Value>,
    #[serde(default)]
    pub connections: serde_json::Value,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: Option<Vec<RemoteTag>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTag {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Executions
// ---------------------------------------------------------------------------

/// An execution as returned by `GET /api/v1/executions[/{id}]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteExecution {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_of: Option<String>,
    /// Run data, present when the listing was requested with `includeData`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RemoteExecution {
    /// Status normalized across n8n versions.
    pub fn normalized_status(&self) -> ExecutionStatus {
        derive_status(
            self.status.as_deref(),
            self.finished,
            self.stopped_at.is_some(),
        )
    }
}

/// One page of executions.
#[derive(Debug, Clone)]
pub struct ExecutionPage {
    pub data: Vec<RemoteExecution>,
    /// Total reported by the remote, or the page length when it reports none.
    pub count: i64,
}

/// Query parameters for `GET /api/v1/executions`.
#[derive(Debug, Clone)]
pub struct ExecutionQuery {
    /// Remote workflow ID to scope the listing to.
    pub workflow_id: Option<String>,
    pub limit: i64,
    pub finished: Option<bool>,
    pub status: Option<String>,
    pub include_data: bool,
}

impl Default for ExecutionQuery {
    fn default() -> Self {
        Self {
            workflow_id: None,
            limit: DEFAULT_SYNC_LIMIT,
            finished: None,
            status: None,
            include_data: false,
        }
    }
}

impl ExecutionQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(workflow_id) = &self.workflow_id {
            params.push(("workflowId", workflow_id.clone()));
        }
        if let Some(finished) = self.finished {
            params.push(("finished", finished.to_string()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if self.include_data {
            params.push(("includeData", "true".to_string()));
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_inner(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { data } | ListEnvelope::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            ItemEnvelope::Wrapped { data } | ItemEnvelope::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PageEnvelope {
    Wrapped {
        data: Vec<RemoteExecution>,
        #[serde(default)]
        count: Option<i64>,
    },
    Bare(Vec<RemoteExecution>),
}

impl From<PageEnvelope> for ExecutionPage {
    fn from(envelope: PageEnvelope) -> Self {
        let (data, count) = match envelope {
            PageEnvelope::Wrapped { data, count } => (data, count),
            PageEnvelope::Bare(data) => (data, None),
        };
        let count = count.unwrap_or(data.len() as i64);
        ExecutionPage { data, count }
    }
}

// ---------------------------------------------------------------------------
// ID helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workflow_list_accepts_both_envelopes() {
        let wrapped: ListEnvelope<RemoteWorkflow> = serde_json::from_value(json!({
            "data": [{ "id": "1", "name": "A", "active": true }]
        }))
        .unwrap();
        let bare: ListEnvelope<RemoteWorkflow> =
            serde_json::from_value(json!([{ "id": 1, "name": "A", "active": true }])).unwrap();

        let wrapped = wrapped.into_inner();
        let bare = bare.into_inner();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].id, bare[0].id);
    }

    #[test]
    fn single_workflow_with_details() {
        let wf: ItemEnvelope<RemoteWorkflow> = serde_json::from_value(json!({
            "id": "abc",
            "name": "Nightly",
            "active": false,
            "nodes": [{ "name": "Start" }],
            "connections": {},
            "tags": [{ "id": 3, "name": "prod" }],
            "updatedAt": "2026-01-02T03:04:05.000Z"
        }))
        .unwrap();
        let wf = wf.into_inner();
        assert_eq!(wf.nodes.len(), 1);
        assert_eq!(wf.tags.unwrap()[0].id, "3");
        assert!(wf.updated_at.is_some());
    }

    #[test]
    fn execution_page_count_defaults_to_len() {
        let page: PageEnvelope = serde_json::from_value(json!({
            "data": [
                { "id": 10, "finished": true, "workflowId": 4, "startedAt": "2026-01-01T00:00:00Z" },
                { "id": "11", "finished": false, "stoppedAt": "2026-01-01T00:01:00Z" }
            ],
            "nextCursor": null
        }))
        .unwrap();
        let page = ExecutionPage::from(page);
        assert_eq!(page.count, 2);
        assert_eq!(page.data[0].id, "10");
        assert_eq!(page.data[0].workflow_id.as_deref(), Some("4"));
        assert_eq!(page.data[0].normalized_status(), ExecutionStatus::Success);
        assert_eq!(page.data[1].normalized_status(), ExecutionStatus::Error);
    }

    #[test]
    fn explicit_status_and_alias() {
        let exec: RemoteExecution = serde_json::from_value(json!({
            "id": "1", "finished": false, "status": "crashed"
        }))
        .unwrap();
        assert_eq!(exec.normalized_status(), ExecutionStatus::Error);
    }

    #[test]
    fn query_params_only_include_set_fields() {
        let params = ExecutionQuery::default().to_params();
        assert_eq!(params, vec![("limit", "100".to_string())]);

        let params = ExecutionQuery {
            workflow_id: Some("7".into()),
            limit: 5,
            finished: Some(true),
            status: Some("error".into()),
            include_data: true,
        }
        .to_params();
        assert_eq!(params.len(), 5);
        assert!(params.contains(&("workflowId", "7".to_string())));
        assert!(params.contains(&("includeData", "true".to_string())));
    }
}
