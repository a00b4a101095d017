use pod_types::Digest;

/// Errors from content store operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// No payload is stored under this digest.
    #[error("content not found: {0}")]
    NotFound(Digest),

    /// The store did not answer within the request window, on every attempt.
    #[error("store timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// The store could not be reached or kept failing after retries.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store reported a digest that does not match the bytes sent.
    #[error("hash mismatch: expected {expected}, store reported {reported}")]
    HashMismatch { expected: Digest, reported: Digest },

    /// Payload exceeds the store's size limit.
    #[error("payload of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Storage has been switched off by configuration.
    #[error("content storage is disabled")]
    Disabled,

    /// Request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
