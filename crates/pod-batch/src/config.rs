use std::time::Duration;

use pod_ledger::MAX_LEAVES_PER_COMMITMENT;
use serde::{Deserialize, Serialize};

use crate::error::CompactorError;

/// Batch compactor configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactorConfig {
    /// Queue length that triggers an immediate flush. Also the most items a
    /// single flush carries.
    pub max_batch_size: usize,
    /// Milliseconds after the last flush at which a non-empty queue is
    /// flushed regardless of size.
    pub batch_timeout_ms: u64,
    /// Milliseconds a queued item may wait before it is dropped with
    /// `Expired`. Checked on each timer tick. `None` disables expiry.
    pub pending_ttl_ms: Option<u64>,
}

impl Default for CompactorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            batch_timeout_ms: 5_000,
            pending_ttl_ms: None,
        }
    }
}

impl CompactorConfig {
    pub fn new(max_batch_size: usize, batch_timeout: Duration) -> Self {
        Self {
            max_batch_size,
            batch_timeout_ms: batch_timeout.as_millis() as u64,
            pending_ttl_ms: None,
        }
    }

    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl_ms = Some(ttl.as_millis() as u64);
        self
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn pending_ttl(&self) -> Option<Duration> {
        self.pending_ttl_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), CompactorError> {
        if self.max_batch_size == 0 {
            return Err(CompactorError::InvalidConfig(
                "max_batch_size must be at least 1".into(),
            ));
        }
        if self.max_batch_size > MAX_LEAVES_PER_COMMITMENT {
            return Err(CompactorError::InvalidConfig(format!(
                "max_batch_size {} exceeds the ledger limit of {MAX_LEAVES_PER_COMMITMENT}",
                self.max_batch_size
            )));
        }
        if self.batch_timeout_ms == 0 {
            return Err(CompactorError::InvalidConfig(
                "batch_timeout_ms must be positive".into(),
            ));
        }
        if self.pending_ttl_ms == Some(0) {
            return Err(CompactorError::InvalidConfig(
                "pending_ttl_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
