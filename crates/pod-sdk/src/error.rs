use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("address derivation failed: {0}")]
    Derive(#[from] pod_crypto::DeriveError),

    #[error("store error: {0}")]
    Store(#[from] pod_store::StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] pod_ledger::LedgerError),

    #[error("commit error: {0}")]
    Commit(#[from] pod_batch::CommitError),

    #[error("compactor error: {0}")]
    Compactor(#[from] pod_batch::CompactorError),

    #[error("verification error: {0}")]
    Verify(#[from] pod_verify::VerifyError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
