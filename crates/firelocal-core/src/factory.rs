//! Factory for the emulator's database client.
//!
//! The emulator used is the unofficial `firebase-server`, which serves the
//! Realtime Database REST API on port 5000 and performs no authentication.
//! The factory therefore presents a fabricated access token. Against a real
//! database instance, real credentials are required.
//!
//! Build one `ClientFactory` at startup and pass it to whoever needs a
//! client. Every call to [`ClientFactory::client`] returns the same client.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::Url;
use tracing::info;

use crate::api::{ApiError, DatabaseClient};
use crate::auth::Credentials;
use crate::backoff::RetryPolicy;
use crate::config::Config;

/// Where the emulator serves the database.
pub const EMULATOR_URL: &str = "http://127.0.0.1:5000/";

/// The emulator endpoint as a parsed URL.
pub fn emulator_url() -> Result<Url, ApiError> {
    Url::parse(EMULATOR_URL).map_err(|e| ApiError::InvalidUrl(format!("{EMULATOR_URL}: {e}")))
}

pub struct ClientFactory {
    credentials: Credentials,
    request_timeout: Duration,
    retry_policy: RetryPolicy,
    client: OnceLock<Arc<DatabaseClient>>,
}

impl ClientFactory {
    /// Capture configuration and fabricate the emulator credentials.
    /// No client is built until [`ClientFactory::client`] is first called.
    pub fn new(config: &Config) -> Self {
        Self {
            credentials: Credentials::for_emulator(),
            request_timeout: config.request_timeout(),
            retry_policy: RetryPolicy::default(),
            client: OnceLock::new(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The shared client, built on first use.
    pub fn client(&self) -> Result<Arc<DatabaseClient>, ApiError> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let built = Arc::new(self.build_client()?);
        // A concurrent caller may have won the race; everyone gets the winner.
        Ok(Arc::clone(self.client.get_or_init(|| built)))
    }

    fn build_client(&self) -> Result<DatabaseClient, ApiError> {
        let client = DatabaseClient::new(
            emulator_url()?,
            self.credentials.clone(),
            self.request_timeout,
        )?
        .with_retry_policy(self.retry_policy.clone());

        info!(
            url = EMULATOR_URL,
            token_expires_at = %self.credentials.access_token().expires_at,
            "Created emulator database client"
        );
        Ok(client)
    }
}
