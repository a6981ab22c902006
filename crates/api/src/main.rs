use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowwatch_api::config::ServerConfig;
use flowwatch_api::{background, routes, state};
use flowwatch_core::credentials::CredentialCipher;
use flowwatch_events::{
    EmailConfig, EmailDelivery, HttpPushTransport, NotificationDispatcher, PgSubscriptionStore,
    PushRelayConfig, PushTransport, UnconfiguredPush,
};
use flowwatch_monitor::{MonitorConfig, MonitorService, MonitorStore, N8nConnector, PgStore};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flowwatch_api=debug,flowwatch_monitor=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let monitor_config = MonitorConfig::from_env();
    tracing::info!(
        enabled = monitor_config.enabled,
        interval_secs = monitor_config.interval.as_secs(),
        "Loaded monitor configuration"
    );

    let credential_key = std::env::var("CREDENTIAL_KEY").expect("CREDENTIAL_KEY must be set");
    let cipher = CredentialCipher::new(&credential_key).expect("CREDENTIAL_KEY must not be empty");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = flowwatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    flowwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    flowwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Notification delivery ---
    let push: Arc<dyn PushTransport> = match PushRelayConfig::from_env() {
        Some(relay) => {
            tracing::info!(relay = %relay.url, "Push relay configured");
            Arc::new(HttpPushTransport::new(relay).expect("Failed to build push HTTP client"))
        }
        None => {
            tracing::warn!("PUSH_RELAY_URL not set, push alerts will not be delivered");
            Arc::new(UnconfiguredPush)
        }
    };
    let mut dispatcher =
        NotificationDispatcher::new(Arc::new(PgSubscriptionStore::new(pool.clone())), push);
    match EmailConfig::from_env() {
        Some(email_config) => {
            let mailer = EmailDelivery::new(email_config).expect("Invalid SMTP configuration");
            dispatcher = dispatcher.with_mailer(Arc::new(mailer));
        }
        None => tracing::info!("SMTP_HOST not set, email alerts disabled"),
    }
    tracing::info!(email = dispatcher.email_enabled(), "Notification dispatcher ready");

    // --- Monitor ---
    let store: Arc<dyn MonitorStore> = Arc::new(PgStore::new(pool));
    let connector = N8nConnector::new(cipher.clone(), monitor_config.http_timeout)
        .expect("Failed to build n8n HTTP client");
    let monitor = MonitorService::new(
        store.clone(),
        Arc::new(connector),
        dispatcher.clone(),
        monitor_config,
    );

    let schedule_cancel = tokio_util::sync::CancellationToken::new();
    let schedule_handle = if monitor.config().enabled {
        Some(tokio::spawn(background::monitor_schedule::run(
            monitor.clone(),
            schedule_cancel.clone(),
        )))
    } else {
        tracing::info!("Monitor schedule disabled, passes run only via /api/v1/monitor/run");
        None
    };

    // --- App state ---
    let state = AppState {
        store,
        monitor,
        cipher,
        dispatcher,
        config: Arc::new(config.clone()),
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid,
        ))
        .layer(cors)
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    schedule_cancel.cancel();
    if let Some(handle) = schedule_handle {
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Monitor pass still running at shutdown, abandoning it");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
