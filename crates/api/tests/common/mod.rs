//! Shared harness for API integration tests.
//!
//! The app runs against [`MemoryStore`] and scripted fake instances, so no
//! database or network is needed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use flowwatch_api::auth::jwt::{generate_access_token, JwtConfig};
use flowwatch_api::config::ServerConfig;
use flowwatch_api::routes;
use flowwatch_api::state::AppState;
use flowwatch_core::credentials::CredentialCipher;
use flowwatch_core::error::CoreError;
use flowwatch_core::types::DbId;
use flowwatch_db::models::instance::Instance;
use flowwatch_events::{AlertPayload, NotificationDispatcher, PushError, PushTarget, PushTransport};
use flowwatch_monitor::{MemoryStore, MonitorConfig, MonitorError, MonitorService, RemoteConnector};
use flowwatch_n8n::{
    ExecutionPage, ExecutionQuery, N8nApiError, RemoteExecution, RemoteWorkflow, WorkflowApi,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const API_KEY: &str = "n8n-api-key";

// ---------------------------------------------------------------------------
// Fake instances
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RemoteState {
    pub workflows: Vec<RemoteWorkflow>,
    pub executions: Vec<RemoteExecution>,
    pub offline: bool,
}

pub type SharedRemote = Arc<Mutex<RemoteState>>;

struct FakeRemote {
    state: SharedRemote,
    authorized: bool,
}

fn unavailable() -> N8nApiError {
    N8nApiError::Api {
        status: 503,
        body: "unavailable".into(),
    }
}

impl FakeRemote {
    /// Lock the remote, failing the way an instance does when it is down or
    /// the key is wrong.
    fn reachable(&self) -> Result<std::sync::MutexGuard<'_, RemoteState>, N8nApiError> {
        let state = self.state.lock().unwrap();
        if !self.authorized {
            return Err(N8nApiError::Api {
                status: 401,
                body: "unauthorized".into(),
            });
        }
        if state.offline {
            return Err(unavailable());
        }
        Ok(state)
    }

    fn set_active(&self, remote_id: &str, active: bool) -> Result<RemoteWorkflow, N8nApiError> {
        let mut state = self.reachable()?;
        let workflow = state
            .workflows
            .iter_mut()
            .find(|w| w.id == remote_id)
            .ok_or_else(unavailable)?;
        workflow.active = active;
        Ok(workflow.clone())
    }
}

#[async_trait]
impl WorkflowApi for FakeRemote {
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflow>, N8nApiError> {
        Ok(self.reachable()?.workflows.clone())
    }

    async fn get_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError> {
        self.reachable()?
            .workflows
            .iter()
            .find(|w| w.id == remote_id)
            .cloned()
            .ok_or_else(unavailable)
    }

    async fn list_executions(&self, query: &ExecutionQuery) -> Result<ExecutionPage, N8nApiError> {
        let state = self.reachable()?;
        let data: Vec<RemoteExecution> = state
            .executions
            .iter()
            .rev()
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(ExecutionPage {
            count: data.len() as i64,
            data,
        })
    }

    async fn get_execution(&self, remote_id: &str) -> Result<RemoteExecution, N8nApiError> {
        self.reachable()?
            .executions
            .iter()
            .find(|e| e.id == remote_id)
            .cloned()
            .ok_or_else(unavailable)
    }

    async fn activate_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError> {
        self.set_active(remote_id, true)
    }

    async fn deactivate_workflow(&self, remote_id: &str) -> Result<RemoteWorkflow, N8nApiError> {
        self.set_active(remote_id, false)
    }

    async fn test_connection(&self) -> bool {
        self.reachable().is_ok()
    }
}

/// Hands out fakes keyed by base URL. A fake reached with a key other than
/// [`API_KEY`] answers every call with 401.
pub struct FakeConnector {
    cipher: CredentialCipher,
    remotes: Mutex<HashMap<String, SharedRemote>>,
}

impl FakeConnector {
    pub fn register(&self, base_url: &str) -> SharedRemote {
        let remote = SharedRemote::default();
        self.remotes
            .lock()
            .unwrap()
            .insert(base_url.to_string(), remote.clone());
        remote
    }
}

impl RemoteConnector for FakeConnector {
    fn connect(&self, instance: &Instance) -> Result<Box<dyn WorkflowApi>, MonitorError> {
        let api_key = self.cipher.open(&instance.api_key_sealed)?;
        let state = self
            .remotes
            .lock()
            .unwrap()
            .get(&instance.base_url)
            .cloned()
            .ok_or_else(|| CoreError::Internal(format!("no fake at {}", instance.base_url)))?;
        Ok(Box::new(FakeRemote {
            state,
            authorized: api_key == API_KEY,
        }))
    }
}

#[derive(Default)]
pub struct RecordingPush {
    pub titles: Mutex<Vec<String>>,
}

#[async_trait]
impl PushTransport for RecordingPush {
    async fn send(&self, _target: &PushTarget, payload: &AlertPayload) -> Result<(), PushError> {
        self.titles.lock().unwrap().push(payload.title.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        cron_secret: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub connector: Arc<FakeConnector>,
    pub push: Arc<RecordingPush>,
    pub cipher: CredentialCipher,
    pub config: ServerConfig,
}

/// Build the full application router with all middleware layers.
///
/// Mirrors the router construction in `main.rs` so tests exercise the same
/// middleware stack production uses.
pub fn build_test_app(config: ServerConfig) -> TestApp {
    let store = MemoryStore::new();
    let cipher = CredentialCipher::new("test-credential-key").unwrap();
    let connector = Arc::new(FakeConnector {
        cipher: cipher.clone(),
        remotes: Mutex::new(HashMap::new()),
    });
    let push = Arc::new(RecordingPush::default());
    let dispatcher = NotificationDispatcher::new(Arc::new(store.clone()), push.clone());
    let monitor = MonitorService::new(
        Arc::new(store.clone()),
        connector.clone(),
        dispatcher.clone(),
        MonitorConfig::default(),
    );

    let state = AppState {
        store: Arc::new(store.clone()),
        monitor,
        cipher: cipher.clone(),
        dispatcher,
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        store,
        connector,
        push,
        cipher,
        config,
    }
}

impl TestApp {
    pub fn new() -> Self {
        build_test_app(test_config())
    }

    /// Create a user and return its id with a valid access token.
    pub fn user(&self, email: &str) -> (DbId, String) {
        let id = self.store.add_user(email);
        let token = generate_access_token(id, &self.config.jwt).unwrap();
        (id, token)
    }

    /// Send a request and return the status with the parsed JSON body
    /// (`Null` for an empty body).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Register an instance through the API against a fresh fake remote.
    pub async fn register_instance(&self, token: &str, base_url: &str) -> (DbId, SharedRemote) {
        let remote = self.connector.register(base_url);
        remote.lock().unwrap().workflows.push(remote_workflow("1", true));
        let (status, body) = self
            .post(
                "/api/v1/instances",
                token,
                serde_json::json!({ "name": "prod", "base_url": base_url, "api_key": API_KEY }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (body["data"]["id"].as_i64().unwrap(), remote)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn remote_workflow(id: &str, active: bool) -> RemoteWorkflow {
    RemoteWorkflow {
        id: id.into(),
        name: format!("Workflow {id}"),
        active,
        nodes: Vec::new(),
        connections: serde_json::Value::Null,
        settings: None,
        tags: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn at(seconds: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(seconds as i64)
}

pub fn remote_execution(id: u32, workflow: &str, status: &str) -> RemoteExecution {
    let failed = status == "error";
    RemoteExecution {
        id: id.to_string(),
        finished: !failed,
        mode: Some("trigger".into()),
        started_at: Some(at(id * 10)),
        stopped_at: Some(at(id * 10 + 2)),
        workflow_id: Some(workflow.into()),
        status: Some(status.into()),
        retry_of: None,
        data: failed.then(|| {
            serde_json::json!({ "resultData": { "error": { "message": "node failed" } } })
        }),
    }
}
