use std::sync::Arc;

use pod_crypto::ContentHasher;
use pod_ledger::LedgerGateway;
use pod_store::ContentStore;
use pod_types::{Address, Digest};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{VerifyError, VerifyResult};

/// A payload fetched through the verified read path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedContent {
    pub address: Address,
    /// The digest the ledger commits to.
    pub digest: Digest,
    /// Bytes exactly as returned by the store.
    pub payload: Vec<u8>,
    /// Whether `payload` hashes to `digest`.
    pub verified: bool,
}

impl VerifiedContent {
    /// The payload, only if it matched its commitment.
    pub fn verified_payload(&self) -> Option<&[u8]> {
        self.verified.then_some(self.payload.as_slice())
    }

    /// Decode the payload as JSON, regardless of verification state.
    pub fn json<T: DeserializeOwned>(&self) -> VerifyResult<T> {
        serde_json::from_slice(&self.payload).map_err(|e| VerifyError::Decode(e.to_string()))
    }
}

/// Checks stored payloads against the digests committed on the ledger.
pub struct VerificationLayer {
    ledger: Arc<dyn LedgerGateway>,
    store: Arc<dyn ContentStore>,
    hasher: ContentHasher,
}

impl VerificationLayer {
    pub fn new(ledger: Arc<dyn LedgerGateway>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            ledger,
            store,
            hasher: ContentHasher::CONTENT,
        }
    }

    /// Fetch the payload committed at `address` and check its hash.
    ///
    /// A hash mismatch yields `verified: false`. Fails with `NotFound` when
    /// the ledger has no commitment at the address and `StoreUnavailable`
    /// when the store keeps failing.
    pub async fn fetch_and_verify(&self, address: &Address) -> VerifyResult<VerifiedContent> {
        let digest = self.ledger.fetch_digest(address).await?;
        let payload = self.store.get(&digest).await?;
        let verified = self.verify(&payload, &digest);
        if verified {
            debug!(address = %address.short_id(), digest = %digest.short_hex(), "content verified");
        } else {
            warn!(
                address = %address.short_id(),
                digest = %digest.short_hex(),
                actual = %self.hasher.hash(&payload).short_hex(),
                "content does not match its commitment"
            );
        }
        Ok(VerifiedContent {
            address: *address,
            digest,
            payload,
            verified,
        })
    }

    /// Returns `true` if `payload` hashes to `digest`.
    pub fn verify(&self, payload: &[u8], digest: &Digest) -> bool {
        self.hasher.verify(payload, digest)
    }
}

impl std::fmt::Debug for VerificationLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationLayer")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}
