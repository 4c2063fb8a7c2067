use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{DriveClientError, Result};

/// How long an access token is considered fresh when the settings do not say.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;

/// How many refresh-and-probe attempts to make before giving up on a
/// connection when the settings do not say.
pub const DEFAULT_CONNECT_RETRY_ATTEMPTS: u32 = 50;

/// Fixed delay between failed connection attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Everything needed to reach the drive API, usually deserialized from a
/// caller-supplied settings JSON. Validation happens at construction; an
/// invalid settings object never issues a network call.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    /// Upper bound on concurrent transfer workers per batch.
    pub max_concurrency: usize,
    /// Long-lived token exchanged for access tokens.
    pub refresh_token: String,
    /// Base URL of the drive API, e.g. `https://graph.microsoft.com/v1.0`.
    pub base_url: String,
    /// Token endpoint URL.
    pub auth_url: String,
    /// Id of the registered application.
    pub client_id: String,
    /// Permission scopes requested with each token grant.
    pub permissions: Vec<String>,
    pub redirect_uri: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_connect_retry_attempts")]
    pub connect_retry_attempts: u32,
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_connect_retry_attempts() -> u32 {
    DEFAULT_CONNECT_RETRY_ATTEMPTS
}

impl ConnectionSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| DriveClientError::Configuration(format!("could not initialize settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let settings: Self = serde_json::from_value(value)
            .map_err(|e| DriveClientError::Configuration(format!("could not initialize settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the parts serde cannot: positive limits and well-formed URLs.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(DriveClientError::Configuration(
                "max_concurrency must be a positive integer".to_string(),
            ));
        }
        if self.connect_retry_attempts == 0 {
            return Err(DriveClientError::Configuration(
                "connect_retry_attempts must be a positive integer".to_string(),
            ));
        }
        for (name, value) in [("base_url", &self.base_url), ("auth_url", &self.auth_url)] {
            Url::parse(value)
                .map_err(|e| DriveClientError::Configuration(format!("{name} is not a valid URL: {e}")))?;
        }
        debug!(
            "settings validated: max_concurrency={}, refresh_interval={}s, connect_retry_attempts={}",
            self.max_concurrency, self.refresh_interval_secs, self.connect_retry_attempts
        );
        Ok(())
    }

    /// The scope string sent with each token grant.
    pub fn scope(&self) -> String {
        self.permissions.join("+")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.connect_retry_attempts,
            per_attempt_delay: CONNECT_RETRY_DELAY,
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
        }
    }
}

/// Retry and heartbeat knobs, immutable once derived from the settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_delay: Duration,
    pub refresh_interval: Duration,
}
