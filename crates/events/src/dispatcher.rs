//! Fan-out of one alert to every channel a user has enabled.
//!
//! Push delivery goes to all of the user's active subscriptions concurrently.
//! An endpoint reported gone is deactivated and never retried. Individual
//! channel failures are counted and logged, never raised: the only hard error
//! is failing to look up the subscriptions in the first place.

use std::sync::Arc;

use async_trait::async_trait;
use flowwatch_core::types::DbId;
use flowwatch_db::models::push_subscription::PushSubscription;
use flowwatch_db::repositories::PushSubscriptionRepo;
use flowwatch_db::DbPool;
use futures::future::join_all;

use crate::delivery::email::{AlertMailer, EmailError};
use crate::delivery::push::{PushError, PushTarget, PushTransport};
use crate::payload::AlertPayload;

/// Boxed error returned by storage seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// Subscription storage
// ---------------------------------------------------------------------------

/// Where push subscriptions live.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn active_subscriptions(&self, user_id: DbId) -> Result<Vec<PushSubscription>, BoxError>;

    /// Permanently disable a subscription whose endpoint is gone.
    async fn deactivate_subscription(&self, subscription_id: DbId) -> Result<(), BoxError>;
}

/// Postgres-backed subscription store.
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: DbPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn active_subscriptions(&self, user_id: DbId) -> Result<Vec<PushSubscription>, BoxError> {
        Ok(PushSubscriptionRepo::list_active_for_user(&self.pool, user_id).await?)
    }

    async fn deactivate_subscription(&self, subscription_id: DbId) -> Result<(), BoxError> {
        Ok(PushSubscriptionRepo::deactivate(&self.pool, subscription_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Error type for the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to load push subscriptions: {0}")]
    Lookup(BoxError),
}

/// Per-endpoint push results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Who to notify and over which channels.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub user_id: DbId,
    pub push: bool,
    /// Email address, when email alerts are enabled and an address is known.
    pub email: Option<String>,
}

impl Recipient {
    /// Whether any channel is enabled at all.
    pub fn has_channel(&self) -> bool {
        self.push || self.email.is_some()
    }
}

/// Combined result across channels. `None` means the channel was not used.
#[derive(Debug, Clone, Default)]
pub struct NotifyReport {
    pub push: Option<DispatchOutcome>,
    pub email: Option<bool>,
}

impl NotifyReport {
    /// At least one channel accepted the alert.
    pub fn delivered(&self) -> bool {
        self.push.is_some_and(|p| p.sent > 0) || self.email == Some(true)
    }
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

/// Delivers alerts over push and email.
#[derive(Clone)]
pub struct NotificationDispatcher {
    subscriptions: Arc<dyn SubscriptionStore>,
    push: Arc<dyn PushTransport>,
    mailer: Option<Arc<dyn AlertMailer>>,
}

impl NotificationDispatcher {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, push: Arc<dyn PushTransport>) -> Self {
        Self {
            subscriptions,
            push,
            mailer: None,
        }
    }

    /// Enable the email channel.
    pub fn with_mailer(mut self, mailer: Arc<dyn AlertMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn email_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Email one alert to `to`, outside any user's preferences. `None` when
    /// no mailer is configured.
    pub async fn send_email(
        &self,
        to: &str,
        payload: &AlertPayload,
    ) -> Option<Result<(), EmailError>> {
        let mailer = self.mailer.as_ref()?;
        Some(mailer.send_alert(to, payload).await)
    }

    /// Push an alert to every active subscription of `user_id`.
    pub async fn dispatch(
        &self,
        user_id: DbId,
        payload: &AlertPayload,
    ) -> Result<DispatchOutcome, DispatchError> {
        let subscriptions = self
            .subscriptions
            .active_subscriptions(user_id)
            .await
            .map_err(DispatchError::Lookup)?;

        let deliveries = subscriptions
            .iter()
            .map(|subscription| self.push_one(subscription, payload));
        let results = join_all(deliveries).await;

        let sent = results.iter().filter(|ok| **ok).count();
        let outcome = DispatchOutcome {
            sent,
            failed: results.len() - sent,
        };

        tracing::debug!(
            user_id,
            kind = %payload.kind,
            sent = outcome.sent,
            failed = outcome.failed,
            "Push dispatch complete",
        );
        Ok(outcome)
    }

    /// Send an alert over every channel enabled for `recipient`.
    pub async fn notify(&self, recipient: &Recipient, payload: &AlertPayload) -> NotifyReport {
        let mut report = NotifyReport::default();

        if recipient.push {
            report.push = match self.dispatch(recipient.user_id, payload).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(user_id = recipient.user_id, error = %e, "Push dispatch failed");
                    Some(DispatchOutcome::default())
                }
            };
        }

        if let (Some(address), Some(mailer)) = (&recipient.email, &self.mailer) {
            let sent = match mailer.send_alert(address, payload).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(
                        user_id = recipient.user_id,
                        error = %e,
                        "Alert email failed",
                    );
                    false
                }
            };
            report.email = Some(sent);
        }

        report
    }

    /// Deliver to one subscription. Returns whether it was accepted.
    async fn push_one(&self, subscription: &PushSubscription, payload: &AlertPayload) -> bool {
        let target = PushTarget {
            endpoint: subscription.endpoint.clone(),
            p256dh: subscription.p256dh.clone(),
            auth: subscription.auth.clone(),
        };

        match self.push.send(&target, payload).await {
            Ok(()) => true,
            Err(PushError::Gone(status)) => {
                tracing::info!(
                    subscription_id = subscription.id,
                    status,
                    "Push endpoint gone, deactivating subscription",
                );
                if let Err(e) = self.subscriptions.deactivate_subscription(subscription.id).await {
                    tracing::warn!(
                        subscription_id = subscription.id,
                        error = %e,
                        "Failed to deactivate subscription",
                    );
                }
                false
            }
            Err(e) => {
                tracing::warn!(subscription_id = subscription.id, error = %e, "Push delivery failed");
                false
            }
        }
    }
}
