use std::sync::Arc;

use chrono::{DateTime, Utc};
use pod_crypto::{MerkleProof, MerkleTree};
use pod_ledger::LedgerError;
use pod_types::{Address, Digest, Ticket, TxRef};

/// One item of a flushed batch, at its leaf position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchEntry {
    pub ticket: Ticket,
    pub address: Address,
    pub digest: Digest,
}

/// A batch that landed on the ledger.
///
/// Shared by every receipt issued for the batch; there is no global
/// "last batch" slot.
#[derive(Clone, Debug)]
pub struct BatchCommitment {
    pub batch_id: u64,
    pub tx_ref: TxRef,
    pub entries: Vec<BatchEntry>,
    pub committed_at: DateTime<Utc>,
    tree: MerkleTree,
}

impl BatchCommitment {
    pub(crate) fn new(
        batch_id: u64,
        tx_ref: TxRef,
        entries: Vec<BatchEntry>,
        tree: MerkleTree,
    ) -> Self {
        Self {
            batch_id,
            tx_ref,
            entries,
            committed_at: Utc::now(),
            tree,
        }
    }

    pub fn root(&self) -> Digest {
        self.tree.root()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Leaf position of a ticket in this batch.
    pub fn index_of(&self, ticket: &Ticket) -> Option<usize> {
        self.entries.iter().position(|e| &e.ticket == ticket)
    }

    /// Inclusion proof for the item at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        self.tree.proof(index)
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }
}

/// What a waiter receives when its item commits.
#[derive(Clone, Debug)]
pub struct CommitReceipt {
    pub ticket: Ticket,
    pub address: Address,
    pub digest: Digest,
    pub proof: MerkleProof,
    pub batch: Arc<BatchCommitment>,
}

impl CommitReceipt {
    pub fn tx_ref(&self) -> &TxRef {
        &self.batch.tx_ref
    }

    pub fn root(&self) -> Digest {
        self.batch.root()
    }

    /// Leaf position of this item, equal to its enqueue position in the batch.
    pub fn index(&self) -> usize {
        self.proof.index
    }

    /// Check the proof against the committed root.
    pub fn verify(&self) -> bool {
        self.proof.proves(&self.digest, &self.batch.root())
    }
}

/// Result of one flush.
#[derive(Clone, Debug)]
pub enum FlushOutcome {
    Committed(Arc<BatchCommitment>),
    Failed {
        batch_id: u64,
        items: usize,
        error: LedgerError,
    },
}

impl FlushOutcome {
    pub fn batch_id(&self) -> u64 {
        match self {
            Self::Committed(c) => c.batch_id,
            Self::Failed { batch_id, .. } => *batch_id,
        }
    }

    pub fn items(&self) -> usize {
        match self {
            Self::Committed(c) => c.len(),
            Self::Failed { items, .. } => *items,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}
