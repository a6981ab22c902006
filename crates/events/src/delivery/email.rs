//! Email alert delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send plain-text
//! alert emails. Configuration is loaded from environment variables; if
//! `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and no
//! mailer should be constructed.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::payload::AlertPayload;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@flowwatch.local";

/// Subject prefix on every alert email.
const SUBJECT_PREFIX: &str = "[FlowWatch]";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Base URL prepended to alert deep links, e.g. `https://monitor.example.com`.
    pub app_url: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      |                            |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@flowwatch.local`  |
    /// | `SMTP_USER`     | no       |                            |
    /// | `SMTP_PASSWORD` | no       |                            |
    /// | `APP_URL`       | no       |                            |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            app_url: std::env::var("APP_URL").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// AlertMailer
// ---------------------------------------------------------------------------

/// Sends one alert to one email address.
#[async_trait]
pub trait AlertMailer: Send + Sync {
    async fn send_alert(&self, to_email: &str, payload: &AlertPayload) -> Result<(), EmailError>;
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends alert emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Build the SMTP transport. No connection is opened until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            config,
        })
    }
}

/// Assemble the plain-text message for an alert.
fn render_message(
    config: &EmailConfig,
    to_email: &str,
    payload: &AlertPayload,
) -> Result<Message, EmailError> {
    let link = match &config.app_url {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), payload.url),
        None => payload.url.clone(),
    };
    let body = format!("{}\n\nDetails: {link}\n", payload.body);

    Message::builder()
        .from(config.from_address.parse()?)
        .to(to_email.parse()?)
        .subject(format!("{SUBJECT_PREFIX} {}", payload.title))
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| EmailError::Build(e.to_string()))
}

#[async_trait]
impl AlertMailer for EmailDelivery {
    async fn send_alert(&self, to_email: &str, payload: &AlertPayload) -> Result<(), EmailError> {
        let email = render_message(&self.config, to_email, payload)?;
        self.mailer.send(email).await?;

        tracing::info!(to = to_email, kind = %payload.kind, "Alert email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::AlertContext;
    use assert_matches::assert_matches;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            from_address: DEFAULT_FROM_ADDRESS.into(),
            smtp_user: None,
            smtp_password: None,
            app_url: Some("https://monitor.example.com/".into()),
        }
    }

    fn payload() -> AlertPayload {
        AlertPayload::workflow_recovered(&AlertContext {
            workflow_id: 3,
            workflow_name: "Invoices".into(),
            instance_id: 1,
            instance_name: "prod".into(),
            execution_id: None,
        })
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn render_prefixes_subject_and_links_dashboard() {
        let message = render_message(&config(), "ops@example.com", &payload()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: [FlowWatch] Workflow Recovered: Invoices"));
        assert!(raw.contains("https://monitor.example.com/workflows/3"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        assert_matches!(
            render_message(&config(), "not-an-email", &payload()),
            Err(EmailError::Address(_))
        );
    }
}
