use std::sync::Arc;
use std::time::Duration;

use pod_batch::{BatchCompactor, CommitReceipt, CompactorStats, PendingCommit};
use pod_crypto::AddressDeriver;
use pod_ledger::LedgerGateway;
use pod_store::{ContentStore, HttpContentStore, MessageContent, ParticipantMetadata};
use pod_types::{Address, Digest, MessageType, PublicKey};
use pod_verify::{VerificationLayer, VerifiedContent};
use tracing::debug;

use crate::config::PodConfig;
use crate::error::SdkResult;

/// A payload that has been stored and queued for commitment.
#[derive(Debug)]
pub struct Published {
    pub address: Address,
    pub digest: Digest,
    pub pending: PendingCommit,
}

impl Published {
    /// Wait until the payload's batch lands on the ledger.
    pub async fn committed(self) -> SdkResult<CommitReceipt> {
        Ok(self.pending.wait().await?)
    }

    /// Like [`Published::committed`], giving up after `limit`.
    pub async fn committed_within(&mut self, limit: Duration) -> SdkResult<CommitReceipt> {
        Ok(self.pending.wait_timeout(limit).await?)
    }
}

/// High-level PoD API.
pub struct PodClient {
    deriver: AddressDeriver,
    store: Arc<dyn ContentStore>,
    compactor: BatchCompactor,
    verifier: VerificationLayer,
}

impl PodClient {
    /// Build a client over explicit store and ledger backends. Must be
    /// called from within a Tokio runtime.
    pub fn new(
        config: &PodConfig,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerGateway>,
    ) -> SdkResult<Self> {
        config.validate()?;
        let compactor = BatchCompactor::new(config.batch.clone(), Arc::clone(&ledger))?;
        let verifier = VerificationLayer::new(ledger, Arc::clone(&store));
        Ok(Self {
            deriver: AddressDeriver::new(config.program_id),
            store,
            compactor,
            verifier,
        })
    }

    /// Build a client that talks to the content store over HTTP.
    pub fn connect(config: &PodConfig, ledger: Arc<dyn LedgerGateway>) -> SdkResult<Self> {
        let store = Arc::new(HttpContentStore::new(config.store.clone())?);
        Self::new(config, store, ledger)
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn compactor(&self) -> &BatchCompactor {
        &self.compactor
    }

    pub fn stats(&self) -> CompactorStats {
        self.compactor.stats()
    }

    // ---- Write path ----

    /// Store `payload` and queue its digest for commitment at `address`.
    pub async fn publish(&self, address: Address, payload: &[u8]) -> SdkResult<Published> {
        let digest = self.store.put(payload).await?;
        self.enqueue(address, digest).await
    }

    /// Store a direct message and queue it at its derived message address.
    pub async fn publish_message(
        &self,
        sender: &PublicKey,
        recipient: &PublicKey,
        content: &MessageContent,
        message_type: MessageType,
    ) -> SdkResult<Published> {
        let record = content.to_record()?;
        let digest = self.store.put_record(&record).await?;
        let address = self
            .deriver
            .message(sender, recipient, &digest, message_type)?;
        self.enqueue(address, digest).await
    }

    /// Store a channel broadcast and queue it at its derived address.
    pub async fn publish_channel_message(
        &self,
        channel: &Address,
        sender: &PublicKey,
        nonce: u64,
        content: &MessageContent,
    ) -> SdkResult<Published> {
        let record = content.to_record()?;
        let digest = self.store.put_record(&record).await?;
        let address = self.deriver.channel_message(channel, sender, nonce)?;
        self.enqueue(address, digest).await
    }

    /// Store a participant's extended profile and queue it at the
    /// participant address for `(channel, agent)`.
    pub async fn publish_participant_metadata(
        &self,
        channel: &Address,
        agent: &Address,
        metadata: &ParticipantMetadata,
    ) -> SdkResult<Published> {
        let record = metadata.to_record()?;
        let digest = self.store.put_record(&record).await?;
        let address = self.deriver.participant(channel, agent)?;
        self.enqueue(address, digest).await
    }

    async fn enqueue(&self, address: Address, digest: Digest) -> SdkResult<Published> {
        let pending = self.compactor.enqueue(address, digest).await?;
        debug!(
            address = %address.short_id(),
            digest = %digest.short_hex(),
            ticket = %pending.ticket().short_id(),
            "published"
        );
        Ok(Published {
            address,
            digest,
            pending,
        })
    }

    // ---- Read path ----

    /// Fetch the payload committed at `address` and check it against the
    /// committed digest.
    pub async fn read_verified(&self, address: &Address) -> SdkResult<VerifiedContent> {
        Ok(self.verifier.fetch_and_verify(address).await?)
    }

    /// Read a message body. The flag reports whether it matched its commitment.
    pub async fn read_message(&self, address: &Address) -> SdkResult<(MessageContent, bool)> {
        let content = self.read_verified(address).await?;
        Ok((content.json()?, content.verified))
    }

    // ---- Lifecycle ----

    /// Flush everything still queued and stop accepting new items.
    pub async fn shutdown(&self) -> usize {
        self.compactor.shutdown().await
    }
}

impl std::fmt::Debug for PodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodClient")
            .field("program_id", self.deriver.program_id())
            .field("compactor", &self.compactor)
            .finish_non_exhaustive()
    }
}
