//! Push delivery to browser subscriptions through a push relay.
//!
//! The relay owns the VAPID keys and the payload encryption, so the
//! subscription secrets only ever travel to it. [`HttpPushTransport`] POSTs
//! the subscription and the alert to the relay, which answers with the
//! status it got from the browser push service. A 404 or 410 means the
//! subscription is gone for good.

use std::time::Duration;

use async_trait::async_trait;

use crate::payload::AlertPayload;

/// HTTP request timeout for a single push.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Seconds the push service may hold an undelivered message.
const PUSH_TTL_SECS: u32 = 86_400;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for push delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The endpoint no longer exists (HTTP 404/410). The subscription must be
    /// deactivated.
    #[error("Push endpoint gone (HTTP {0})")]
    Gone(u16),

    /// The relay answered with another non-2xx status.
    #[error("Push relay returned HTTP {0}")]
    HttpStatus(u16),

    /// No relay is configured, so nothing can be delivered.
    #[error("Push relay is not configured")]
    NotConfigured,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where the push relay lives.
#[derive(Debug, Clone)]
pub struct PushRelayConfig {
    /// Full URL the relay accepts deliveries on.
    pub url: String,
    /// Sent as a Bearer token when set.
    pub token: Option<String>,
}

impl PushRelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `PUSH_RELAY_URL` is not set.
    ///
    /// | Variable           | Required |
    /// |--------------------|----------|
    /// | `PUSH_RELAY_URL`   | yes      |
    /// | `PUSH_RELAY_TOKEN` | no       |
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("PUSH_RELAY_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())?;
        Some(Self {
            url,
            token: std::env::var("PUSH_RELAY_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One browser push subscription.
#[derive(Debug, Clone)]
pub struct PushTarget {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Sends an alert to one subscription endpoint.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, target: &PushTarget, payload: &AlertPayload) -> Result<(), PushError>;
}

/// Delivers alerts through the push relay over HTTP.
pub struct HttpPushTransport {
    client: reqwest::Client,
    relay: PushRelayConfig,
}

impl HttpPushTransport {
    /// Build a transport with its own client and a 10 second request timeout.
    pub fn new(relay: PushRelayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, relay })
    }

    /// Reuse an existing client.
    pub fn with_client(client: reqwest::Client, relay: PushRelayConfig) -> Self {
        Self { client, relay }
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(&self, target: &PushTarget, payload: &AlertPayload) -> Result<(), PushError> {
        let body = serde_json::json!({
            "subscription": {
                "endpoint": target.endpoint,
                "keys": {
                    "p256dh": target.p256dh,
                    "auth": target.auth,
                },
            },
            "ttl": PUSH_TTL_SECS,
            "notification": payload,
        });

        let mut request = self.client.post(&self.relay.url).json(&body);
        if let Some(token) = &self.relay.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(()),
            404 | 410 => Err(PushError::Gone(status)),
            _ => Err(PushError::HttpStatus(status)),
        }
    }
}

/// Stand-in used when no relay is configured. Every delivery fails without
/// touching the subscription.
pub struct UnconfiguredPush;

#[async_trait]
impl PushTransport for UnconfiguredPush {
    async fn send(&self, _target: &PushTarget, _payload: &AlertPayload) -> Result<(), PushError> {
        Err(PushError::NotConfigured)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
