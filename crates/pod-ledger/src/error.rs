use pod_types::Address;

/// Errors produced at the ledger boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("no committed record at {0}")]
    NotFound(Address),

    #[error("ledger rejected transaction: {0}")]
    Rejected(String),

    #[error("ledger did not confirm in time")]
    Timeout,

    #[error("malformed ledger record: {0}")]
    MalformedRecord(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
