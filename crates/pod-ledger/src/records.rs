use chrono::{DateTime, Utc};
use pod_crypto::ContentHasher;
use pod_types::{Digest, TxRef};
use serde::{Deserialize, Serialize};

/// Largest batch a single commitment may summarize.
pub const MAX_LEAVES_PER_COMMITMENT: usize = 100;

const TX_HASHER: ContentHasher = ContentHasher::new("pod-ledger-tx-v1");

/// Everything submitted alongside a Merkle root. Individual digests never
/// travel to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentMetadata {
    /// Compactor-local batch sequence number.
    pub batch_id: u64,
    /// Number of leaves under the root.
    pub leaf_count: usize,
    pub created_at: DateTime<Utc>,
}

impl CommitmentMetadata {
    pub fn new(batch_id: u64, leaf_count: usize) -> Self {
        Self {
            batch_id,
            leaf_count,
            created_at: Utc::now(),
        }
    }
}

/// A commitment as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCommitment {
    /// Position in the ledger's commitment log, starting at 1.
    pub seq: u64,
    pub tx_ref: TxRef,
    pub root: Digest,
    pub metadata: CommitmentMetadata,
}

impl LedgerCommitment {
    /// Record a commitment at `seq`. The transaction reference is derived
    /// from the sequence number, root, and leaf count.
    pub fn new(seq: u64, root: Digest, metadata: CommitmentMetadata) -> Self {
        let mut buf = Vec::with_capacity(48);
        buf.extend_from_slice(&seq.to_be_bytes());
        buf.extend_from_slice(root.as_bytes());
        buf.extend_from_slice(&(metadata.leaf_count as u64).to_be_bytes());
        let tx_ref = TxRef::new(TX_HASHER.hash(&buf).to_hex());
        Self {
            seq,
            tx_ref,
            root,
            metadata,
        }
    }
}
