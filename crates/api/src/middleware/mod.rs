//! Request extractors for authentication.
//!
//! - [`auth::AuthUser`] -- the user behind a JWT Bearer token.
//! - [`auth::CronAuth`] -- the caller of the cron trigger.

pub mod auth;
