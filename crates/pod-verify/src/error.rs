use pod_ledger::LedgerError;
use pod_store::StoreError;
use pod_types::{Address, Digest};

/// Errors from the verified read path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The ledger holds no commitment at the address.
    #[error("no commitment at {0}")]
    NotFound(Address),

    /// The ledger commits to a digest the store does not hold.
    #[error("committed content {0} is missing from the store")]
    ContentMissing(Digest),

    /// The store failed after its retries were exhausted.
    #[error("content store unavailable: {0}")]
    StoreUnavailable(StoreError),

    /// The ledger lookup failed for a reason other than absence.
    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("payload decode error: {0}")]
    Decode(String),
}

impl From<LedgerError> for VerifyError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(address) => Self::NotFound(address),
            other => Self::Ledger(other),
        }
    }
}

impl From<StoreError> for VerifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(digest) => Self::ContentMissing(digest),
            other => Self::StoreUnavailable(other),
        }
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;
