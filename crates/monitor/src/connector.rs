//! Builds authenticated remote clients for stored instances.

use std::time::Duration;

use flowwatch_core::credentials::CredentialCipher;
use flowwatch_db::models::instance::Instance;
use flowwatch_n8n::{N8nApi, WorkflowApi};

use crate::error::MonitorError;

/// Turns a stored instance into a client for its REST API.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, instance: &Instance) -> Result<Box<dyn WorkflowApi>, MonitorError>;
}

/// Connector for real n8n instances.
///
/// Opens the sealed API key on every call; plaintext keys are never kept
/// beyond the lifetime of the returned client. All clients share one
/// connection pool.
pub struct N8nConnector {
    cipher: CredentialCipher,
    client: reqwest::Client,
}

impl N8nConnector {
    pub fn new(cipher: CredentialCipher, http_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(http_timeout).build()?;
        Ok(Self { cipher, client })
    }
}

impl RemoteConnector for N8nConnector {
    fn connect(&self, instance: &Instance) -> Result<Box<dyn WorkflowApi>, MonitorError> {
        let api_key = self.cipher.open(&instance.api_key_sealed)?;
        Ok(Box::new(N8nApi::with_client(
            self.client.clone(),
            &instance.base_url,
            api_key,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use flowwatch_core::error::CoreError;

    fn instance(sealed: Vec<u8>) -> Instance {
        Instance {
            id: 1,
            user_id: 1,
            name: "prod".into(),
            base_url: "http://127.0.0.1:1".into(),
            api_key_sealed: sealed,
            is_active: true,
            last_check_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn connect_opens_sealed_key() {
        let cipher = CredentialCipher::new("secret").unwrap();
        let sealed = cipher.seal("api-key").unwrap();
        let connector = N8nConnector::new(cipher, Duration::from_secs(1)).unwrap();
        assert!(connector.connect(&instance(sealed)).is_ok());
    }

    #[test]
    fn connect_rejects_key_sealed_with_other_secret() {
        let sealed = CredentialCipher::new("old-secret")
            .unwrap()
            .seal("api-key")
            .unwrap();
        let connector =
            N8nConnector::new(CredentialCipher::new("new-secret").unwrap(), Duration::from_secs(1))
                .unwrap();
        assert_matches!(
            connector.connect(&instance(sealed)).err(),
            Some(MonitorError::Core(CoreError::Internal(_)))
        );
    }
}
