use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use drive_types::TokenResponse;
use reqwest::header::HeaderValue;
use tracing::debug;
use url::Url;

use crate::error::{DriveClientError, Result};
use crate::settings::{ConnectionSettings, RetryPolicy};

/// Mutable authentication and connectivity state of one client instance.
///
/// Exactly one `Session` exists per [`crate::DriveClient`] stack; it is only
/// ever mutated by [`TokenLifecycle`] and the connection guard. Outbound
/// requests read the installed bearer header, nothing else.
#[derive(Debug)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    auth_header: HeaderValue,
    last_refreshed_at: Option<Instant>,
    is_connected: bool,
}

/// Shared handle to the session state. Writers are the token lifecycle and
/// the connection guard; everything else takes read locks.
pub type SharedSession = Arc<RwLock<Session>>;

impl Session {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            auth_header: HeaderValue::from_static(""),
            last_refreshed_at: None,
            is_connected: false,
        }
    }

    pub fn new_shared(refresh_token: impl Into<String>) -> SharedSession {
        Arc::new(RwLock::new(Self::new(refresh_token)))
    }

    /// Replaces the token pair and the derived auth header in one step.
    /// The header is built before any field changes, so a token the
    /// transport cannot carry leaves the session exactly as it was.
    pub fn install_tokens(&mut self, tokens: TokenResponse) -> Result<()> {
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", tokens.access_token))
            .map_err(|e| DriveClientError::Auth(format!("access token is not a valid header value: {e}")))?;

        self.access_token = tokens.access_token;
        self.refresh_token = tokens.refresh_token;
        self.auth_header = auth_header;
        self.last_refreshed_at = Some(Instant::now());
        Ok(())
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn auth_header(&self) -> HeaderValue {
        self.auth_header.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.is_connected = connected;
    }

    /// Whether the access token is old enough for the heartbeat to renew it.
    /// A session that has never refreshed is always stale.
    pub fn is_stale(&self, refresh_interval: Duration) -> bool {
        match self.last_refreshed_at {
            Some(at) => at.elapsed() > refresh_interval,
            None => true,
        }
    }
}

/// Sole authority over credential mutation.
///
/// Batch workers never touch this; they read the header the lifecycle
/// installed, so token state cannot race with in-flight transfers.
#[derive(Debug, Clone)]
pub struct TokenLifecycle {
    session: SharedSession,
    // Plain client: the token endpoint takes the grant form, not a bearer.
    http: reqwest::Client,
    auth_url: Url,
    client_id: String,
    scope: String,
    redirect_uri: String,
}

impl TokenLifecycle {
    pub fn new(settings: &ConnectionSettings, session: SharedSession) -> Result<Self> {
        Ok(Self {
            session,
            http: reqwest::Client::builder().build()?,
            auth_url: Url::parse(&settings.auth_url)?,
            client_id: settings.client_id.clone(),
            scope: settings.scope(),
            redirect_uri: settings.redirect_uri.clone(),
        })
    }

    /// Exchanges the current refresh token for a new access/refresh pair.
    ///
    /// The response is deserialized in full before the session is touched;
    /// a transport failure or a response missing either token fails with an
    /// auth error and leaves the old credentials in place.
    pub async fn refresh(&self) -> Result<()> {
        let refresh_token = self.session.read()?.refresh_token().to_string();

        let form = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(self.auth_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| DriveClientError::Auth(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DriveClientError::Auth(format!("token refresh request failed: {e}")))?;

        if !status.is_success() {
            return Err(DriveClientError::Auth(format!("token endpoint returned status {status}")));
        }

        let tokens: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| DriveClientError::Auth(format!("token response missing expected fields: {e}")))?;

        debug!("access token refreshed");
        self.session.write()?.install_tokens(tokens)
    }

    /// The heartbeat check: refreshes only when the token has gone stale.
    pub async fn ensure_fresh(&self, policy: &RetryPolicy) -> Result<()> {
        let stale = self.session.read()?.is_stale(policy.refresh_interval);
        if stale {
            debug!("access token stale, refreshing");
            self.refresh().await?;
        }
        Ok(())
    }
}
