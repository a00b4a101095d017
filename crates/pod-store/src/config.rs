use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client-side configuration for a remote content store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the store service, e.g. `http://127.0.0.1:5001`.
    pub base_url: String,
    /// Public gateway prefix used to build shareable links.
    pub gateway_url: String,
    /// Per-request response window.
    pub request_timeout_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub backoff_ms: u64,
    /// Entries in the verified response cache. `0` disables caching.
    pub cache_capacity: usize,
    /// Reject every operation with `StoreError::Disabled`.
    pub disabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".into(),
            gateway_url: "https://ipfs.io/ipfs".into(),
            request_timeout_ms: 30_000,
            max_retries: 3,
            backoff_ms: 200,
            cache_capacity: 256,
            disabled: false,
        }
    }
}

impl StoreConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Bounded exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Total attempts, including the first.
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}
