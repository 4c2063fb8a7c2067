use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::SessionError;

/// Thread-safe collector for the failure messages of one batch.
///
/// Workers report here instead of raising, so "did anything fail" is
/// observed at exactly one synchronized checkpoint per batch and the caller
/// sees one coherent message instead of a race of partial reports.
#[derive(Clone, Default)]
pub struct ErrorSink {
    log: Arc<Mutex<Vec<String>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a failure message. Never fails; a poisoned lock is recovered
    /// since the log holds plain strings that cannot be left half-written.
    pub fn record(&self, message: impl Into<String>) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.push(message.into());
    }

    /// Drains the log under the same lock that guards `record`: joins the
    /// messages with `". "`, clears the log, and fails with one aggregated
    /// error carrying `prefix`. An empty log is a no-op.
    pub fn drain(&self, prefix: &str) -> Result<(), SessionError> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if log.is_empty() {
            return Ok(());
        }
        let joined = log.join(". ");
        log.clear();
        Err(SessionError::Aggregated(format!("{prefix}{joined}")))
    }
}
