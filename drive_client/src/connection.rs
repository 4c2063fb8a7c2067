use tracing::{debug, warn};

use crate::client::DriveClient;
use crate::error::{DriveClientError, Result};
use crate::session::{SharedSession, TokenLifecycle};
use crate::settings::RetryPolicy;

/// Gate in front of every public operation: connect if needed, refresh if
/// stale. One lightweight check per call once the session is up.
#[derive(Debug, Clone)]
pub struct ConnectionGuard {
    session: SharedSession,
    lifecycle: TokenLifecycle,
    client: DriveClient,
    policy: RetryPolicy,
}

impl ConnectionGuard {
    pub fn new(
        session: SharedSession,
        lifecycle: TokenLifecycle,
        client: DriveClient,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            session,
            lifecycle,
            client,
            policy,
        }
    }

    /// Idempotent precondition for public operations.
    ///
    /// Establishes the connection when the session is not connected yet,
    /// then runs the heartbeat refresh. Connected and fresh means zero
    /// network calls.
    pub async fn ensure_connected(&self) -> Result<()> {
        if !self.session.read()?.is_connected() {
            self.establish().await?;
        }
        self.lifecycle.ensure_fresh(&self.policy).await
    }

    /// Refresh-then-probe loop, bounded by the policy's attempt limit with
    /// a fixed delay between failed attempts. A failed probe (rejected or
    /// unreachable) consumes an attempt; a failed token exchange aborts
    /// immediately since more probing cannot fix bad credentials.
    async fn establish(&self) -> Result<()> {
        let max_attempts = self.policy.max_attempts;
        for attempt in 1..=max_attempts {
            self.lifecycle.refresh().await?;

            match self.client.current_drive().await {
                Ok(true) => {
                    debug!("connection established on attempt {attempt}/{max_attempts}");
                    self.session.write()?.set_connected(true);
                    return Ok(());
                },
                Ok(false) => warn!("connection probe rejected (attempt {attempt}/{max_attempts})"),
                Err(e) => warn!("connection probe failed (attempt {attempt}/{max_attempts}): {e}"),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.per_attempt_delay).await;
            }
        }

        Err(DriveClientError::Connection(format!(
            "could not connect to the drive after {max_attempts} attempts"
        )))
    }
}
