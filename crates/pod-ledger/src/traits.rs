use async_trait::async_trait;
use pod_types::{Address, Digest, LedgerRecord, TxRef};

use crate::error::{LedgerError, LedgerResult};
use crate::records::CommitmentMetadata;

/// RPC boundary to the ledger.
///
/// Implementations may be slow and may fail; callers treat every error as
/// final for the request that produced it.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Submit one batch commitment. Exactly one transaction per call.
    async fn submit_commitment(
        &self,
        root: Digest,
        metadata: &CommitmentMetadata,
    ) -> LedgerResult<TxRef>;

    /// Fetch the typed record stored at `address`.
    async fn fetch_record(&self, address: &Address) -> LedgerResult<LedgerRecord>;

    /// Fetch the content digest the record at `address` commits to.
    async fn fetch_digest(&self, address: &Address) -> LedgerResult<Digest> {
        self.fetch_record(address)
            .await?
            .committed_digest()
            .ok_or(LedgerError::NotFound(*address))
    }
}
