//! Alert delivery for the workflow monitor.
//!
//! - [`AlertPayload`] is the channel-neutral alert content.
//! - [`NotificationDispatcher`] fans an alert out to a user's push
//!   subscriptions and optional email address.
//! - [`delivery`] holds the concrete channels (push relay, SMTP email).

pub mod delivery;
pub mod dispatcher;
pub mod payload;

pub use delivery::email::{AlertMailer, EmailConfig, EmailDelivery, EmailError};
pub use delivery::push::{
    HttpPushTransport, PushError, PushRelayConfig, PushTarget, PushTransport, UnconfiguredPush,
};
pub use dispatcher::{
    BoxError, DispatchError, DispatchOutcome, NotificationDispatcher, NotifyReport,
    PgSubscriptionStore, Recipient, SubscriptionStore,
};
pub use payload::{AlertContext, AlertPayload};
